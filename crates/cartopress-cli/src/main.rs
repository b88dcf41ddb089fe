use anyhow::Context;
use clap::Parser;
use log::debug;

use cartopress_core::canvas::PageConfig;
use cartopress_io::DispatchSource;
use cartopress_render::pipeline;
use cartopress_render::SystemViewer;

mod args;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = args::Cli::parse();
    let dsn = cli.dsn.clone();
    let request = cli.into_request().context("invalid arguments")?;
    debug!("request: {} layers", request.layers.len());

    let page = PageConfig::default();
    let mut source = DispatchSource::new(Some(&dsn));
    let outcome = pipeline::run(&request, &mut source, &page, &SystemViewer)
        .context("render failed")?;

    if let Some(path) = &outcome.saved_to {
        eprintln!(
            "wrote {} ({} layer{})",
            path.display(),
            outcome.layers_drawn,
            if outcome.layers_drawn == 1 { "" } else { "s" }
        );
    }
    Ok(())
}
