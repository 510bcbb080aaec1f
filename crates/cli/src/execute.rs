use crate::commands::{analyze, keys, process, status, Commands};
use crate::global::GlobalArgs;
use std::process::ExitCode;
use syntaxfix_core::Result;
use syntaxfix_engine::SyntaxFixEngine;
use tracing::debug;

impl Commands {
    pub async fn execute(self, global: &GlobalArgs) -> eyre::Result<ExitCode> {
        let json = global.json;

        match self {
            Commands::Process {
                path,
                mode,
                caller,
                verbose,
            } => {
                let engine = build_engine(global)?;
                process::execute(&engine, &path, mode, &caller.caller(), json, verbose).await
            }
            Commands::Analyze { path } => {
                let engine = build_engine(global)?;
                analyze::execute(&engine, &path, json).await?;
                Ok(ExitCode::SUCCESS)
            }
            Commands::RequestKey {
                company,
                email,
                use_case,
            } => {
                let engine = build_engine(global)?;
                keys::request_key(&engine, company, email, use_case, json)?;
                Ok(ExitCode::SUCCESS)
            }
            Commands::Usage { caller } => {
                let engine = build_engine(global)?;
                keys::usage(&engine, &caller.caller(), json).await?;
                Ok(ExitCode::SUCCESS)
            }
            Commands::Tiers => {
                status::tiers(json)?;
                Ok(ExitCode::SUCCESS)
            }
            Commands::Status => {
                let engine = build_engine(global)?;
                status::status(&engine, json)?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn build_engine(global: &GlobalArgs) -> Result<SyntaxFixEngine> {
    let config = global.load_config()?;
    debug!(
        sources = %config
            .sources
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        "configuration loaded"
    );
    SyntaxFixEngine::new(config)
}
