// Grab a few traces of input 1 and print a short summary of each.
//
// The board settings are read from the TOML file given as first argument, or the defaults are
// used. Set `RUST_LOG=debug` to see the SCPI traffic.

use std::time::Duration;

use redpitaya_daq::{
    AcquisitionSession, DataExport, InputChannel, RedPitayaConfig, ScopeViewer, ViewerSettings,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => RedPitayaConfig::from_file(path)?,
        None => RedPitayaConfig::default_values()?,
    };

    let link = config.connect()?;
    let mut session = AcquisitionSession::try_new(link, InputChannel::In1, config.poll_options())?;
    let buffer_length = session.buffer_length();
    session.configure(config.acquisition_config(buffer_length))?;

    let mut viewer = ScopeViewer::try_new(session)?;
    println!("Connected to {}", viewer.board_name());
    viewer.set_settings(ViewerSettings {
        nsamples: 1024,
        all_samples: false,
        center_trigger: config.acquisition.center_trigger,
    })?;

    let mut print_summary = |export: DataExport| {
        for labeled in export.data {
            let values = labeled.series.values();
            let max = values.iter().copied().fold(f64::MIN, f64::max);
            let min = values.iter().copied().fold(f64::MAX, f64::min);
            println!(
                "{} {}: {} samples from {:.3e} s, min {min:.4} V, max {max:.4} V",
                export.name,
                labeled.label,
                labeled.series.len(),
                labeled.series.axis().offset(),
            );
        }
    };

    for _ in 0..5 {
        viewer.grab(&mut print_summary)?;
        viewer.stop()?;
        std::thread::sleep(Duration::from_millis(500));
    }

    viewer.acquisition().link().close()?;
    Ok(())
}
