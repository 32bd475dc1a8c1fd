use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    folder_reorg::run().await
}
