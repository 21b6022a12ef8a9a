use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sbchain",
    about = "Lowers parsed sprite/function definitions into a Scratch 3 (.sb3) project."
)]
pub struct Args {
    #[arg(value_name = "INPUT", help = "Definitions JSON produced by the parser.")]
    pub input: PathBuf,

    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "IMAGE",
        help = "Use this .svg or .png as the costume of every target instead of the blank backdrop."
    )]
    pub backdrop: Option<PathBuf>,

    #[arg(long, help = "Write the generated project.json to this path.")]
    pub emit_project_json: Option<PathBuf>,

    #[arg(short, long, help = "Log lowering details to stderr.")]
    pub verbose: bool,
}
