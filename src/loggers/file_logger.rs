use log::{info, LevelFilter, SetLoggerError};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

/// Appends to a per-day log file under log/.
pub fn init_file_logger() -> Result<(), SetLoggerError> {
    let current_date = chrono::offset::Utc::now().date_naive().to_string();
    let path = format!("log/{}.log", current_date);

    let logfile = match FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S)(utc)} {l} - {m}\n",
        )))
        .build(path)
    {
        Ok(appender) => appender,
        Err(error) => {
            eprintln!("Could not open log file: {}", error);
            return Ok(());
        }
    };

    let config = Config::builder()
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .build(Root::builder().appender("logfile").build(LevelFilter::Info));

    match config {
        Ok(config) => {
            log4rs::init_config(config)?;
            info!("File logger initialized");
        }
        Err(error) => eprintln!("Bad logger config: {}", error),
    }

    Ok(())
}
