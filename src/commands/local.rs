// ABOUTME: Local helper commands.
// ABOUTME: Exposes the free-port finder on the command line.

use quall::error::Result;
use quall::output::Output;

pub fn free_port(output: &Output) -> Result<()> {
    let port = quall::net::free_port()?;
    output.success(&port.to_string());
    Ok(())
}
