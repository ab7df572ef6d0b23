#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard gateway binary.

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    risk_fusion_server::run_server().await
}
