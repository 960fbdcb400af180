use clap::Args;

use crate::context::EnvSnapshot;
use crate::oracle::SystemOracle;

#[derive(Debug, Args)]
pub struct AttachArgs {
    /// Session slug from a previous `run`
    pub slug: String,
}

impl AttachArgs {
    pub fn execute(&self, env: &EnvSnapshot) -> anyhow::Result<()> {
        SystemOracle::from_env(env).attach(&self.slug)
    }
}
