use anyhow::Result;

mod app;
mod logging;

fn main() -> Result<()> {
    let args = timefops::cli::parse();
    app::run(args)
}
