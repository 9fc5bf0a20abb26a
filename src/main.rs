use anyhow::Result;

mod app;
mod logging;

fn main() -> Result<()> {
    let args = sift::cli::parse();
    app::run(args)
}
