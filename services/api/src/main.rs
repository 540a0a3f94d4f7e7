use jobsy_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("jobsy: {err}");
        std::process::exit(1);
    }
}
