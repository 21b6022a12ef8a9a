use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn compile_definitions_to_sb3(definitions_json: &str) -> Result<Vec<u8>, JsValue> {
    crate::compile_definitions_json_to_sb3_bytes(
        definitions_json,
        &crate::codegen::CodegenOptions::default(),
    )
    .map_err(|e| JsValue::from_str(&e.to_string()))
}
