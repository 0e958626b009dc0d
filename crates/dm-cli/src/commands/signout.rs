//! Signout command implementation

use anyhow::Result;

use crate::context::Context;
use crate::output::{print_info, print_success};

/// Invalidate the session the configured cookie belongs to
pub async fn signout_command(ctx: &Context) -> Result<()> {
    let message = ctx.sign_out().await?;

    if let Some(message) = message {
        print_info(&message);
    }
    print_success("Signed out");
    Ok(())
}
