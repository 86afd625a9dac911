//! Session commands.

use anyhow::Result;
use serde::Serialize;

use crate::application::Pipeline;
use crate::cli::output::{output, CommandOutput};

#[derive(Debug, Serialize)]
pub struct LogoutOutput {
    pub user: Option<String>,
    pub message: String,
}

impl CommandOutput for LogoutOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

pub async fn logout(pipeline: &Pipeline, json_mode: bool) -> Result<()> {
    let user = pipeline.store().identity().await.map(String::from);
    pipeline.sign_out().await;

    let message = match &user {
        Some(user) => format!("Signed out {user}; local workflow state erased."),
        None => "No user was signed in.".to_string(),
    };
    output(&LogoutOutput { user, message }, json_mode);
    Ok(())
}
