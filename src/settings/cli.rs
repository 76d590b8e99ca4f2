use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Runs with settings/dev.toml unless --settings points elsewhere")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,
}
