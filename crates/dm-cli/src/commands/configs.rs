//! Configs command implementation

use anyhow::Result;

use crate::context::Context;
use crate::output::{format_configurations, print_info};

/// List the configurations the signed-in user may launch desktops in
pub async fn configs_command(ctx: &Context) -> Result<()> {
    let session = ctx.session().await?;
    let tree = ctx.configurations(&session).await?;

    print_info(&format!(
        "Signed in as {} ({})",
        session.uid, session.auth_backend_name
    ));
    println!("{}", format_configurations(&tree));
    Ok(())
}
