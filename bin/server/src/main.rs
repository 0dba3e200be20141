//! typeline server binary.
//!
//! Wires up logging, builds the matchmaking/match-execution collaborator
//! bundle from the environment, and runs the actix-web front end until
//! its listener is closed. Mirrors the teacher's unified `backend` bin
//! (`rbp_core::log(); rbp_server::run().await`).

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tl_core::log();
    let config = tl_server::Config::from_env();
    let services = tl_server::Services::bootstrap(config);
    tl_server::run(services).await
}
