use data::log::{Error, LogSettings, QUIET_TARGETS};

/// Logs to stdout and to `output.log` in the data directory.
pub fn setup() -> Result<(), Error> {
    let settings = LogSettings::from_env()?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ));
        })
        .level(settings.level);

    for target in QUIET_TARGETS {
        dispatch = dispatch.level_for(target, settings.level_for(target));
    }

    dispatch
        .chain(std::io::stdout())
        .chain(settings.open_file()?)
        .apply()?;

    Ok(())
}
