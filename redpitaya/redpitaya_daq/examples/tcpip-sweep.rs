// Sweep output 1 and capture both inputs while the sweep runs.
//
// Connect output 1 to input 1 to see the sweep on the first trace. The sweep settings are read
// from the `[generator]` section of the TOML file given as first argument.

use redpitaya_daq::{
    AcquisitionSession, DataExport, GeneratorSession, InputChannel, RedPitayaConfig, SweepViewer,
    ViewerSettings,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => RedPitayaConfig::from_file(path)?,
        None => RedPitayaConfig::default_values()?,
    };

    let link = config.connect()?;
    let mut generator = GeneratorSession::new(link.slave(), config.output_channel()?);
    generator.configure(config.generator_config(true))?;

    let mut acquisition =
        AcquisitionSession::try_new(link, InputChannel::In1, config.poll_options())?;
    let buffer_length = acquisition.buffer_length();
    acquisition.configure(config.acquisition_config(buffer_length))?;

    let settings = ViewerSettings {
        nsamples: buffer_length,
        all_samples: true,
        center_trigger: config.acquisition.center_trigger,
    };
    let mut viewer = SweepViewer::new(acquisition, generator, settings)?;

    let mut exports = Vec::new();
    viewer.grab(&mut |export: DataExport| exports.push(export))?;

    for labeled in exports.iter().flat_map(|export| export.data.iter()) {
        let rms = (labeled.series.values().iter().map(|v| v * v).sum::<f64>()
            / labeled.series.len() as f64)
            .sqrt();
        println!("{}: {} samples, rms {rms:.4} V", labeled.label, labeled.series.len());
    }

    let (acquisition, generator) = viewer.into_sessions();
    generator.release()?;
    acquisition.link().close()?;
    Ok(())
}
