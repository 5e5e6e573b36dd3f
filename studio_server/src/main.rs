//! ORM Studio API server.
//!
//! Run from repo root: `cargo run -p orm-studio-server`
//! Point it at a database with `STUDIO_DATA_SOURCE=./datasource.json`; without one it serves demo data.

use orm_studio::{init_tracing, run, StudioEnv};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = StudioEnv::from_env()?;
    init_tracing();
    run(env).await?;
    Ok(())
}
