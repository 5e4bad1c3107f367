use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

const LOG_DIR: &str = "logs";

fn open_append(filename: &str) -> io::Result<std::fs::File> {
    // Create directory if it doesn't exist
    if !Path::new(LOG_DIR).exists() {
        std::fs::create_dir_all(LOG_DIR)?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(format!("{}/{}", LOG_DIR, filename))
}

/// Logs a message to a file with timestamp
///
/// # Arguments
///
/// * `filename` - The name of the log file (created under `logs/`)
/// * `message` - The message to log
///
/// # Returns
///
/// * `io::Result<()>` - Success or error result
pub fn log_to_file(filename: &str, message: &str) -> io::Result<()> {
    let mut file = open_append(filename)?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    writeln!(file, "[{}] {}", timestamp, message)?;

    // Ensure the data is written to disk
    file.flush()?;

    Ok(())
}

/// Logs a message to a file with a detailed formatted header
///
/// # Arguments
///
/// * `filename` - The name of the log file
/// * `header` - A descriptive header for this log entry
/// * `message` - The message to log
///
/// # Returns
///
/// * `io::Result<()>` - Success or error result
pub fn log_with_header(filename: &str, header: &str, message: &str) -> io::Result<()> {
    let formatted_message = format!("===== {} =====\n{}\n====================", header, message);
    log_to_file(filename, &formatted_message)
}

/// Appends data to a CSV file, creating headers if the file is new
///
/// # Arguments
///
/// * `filename` - The name of the CSV file
/// * `headers` - Column headers (only written if file is new)
/// * `data` - Row of data to append
///
/// # Returns
///
/// * `io::Result<()>` - Success or error result
pub fn log_csv(filename: &str, headers: &[&str], data: &[&str]) -> io::Result<()> {
    let path = format!("{}/{}", LOG_DIR, filename);
    let file_exists = Path::new(&path).exists();

    let mut file = open_append(filename)?;

    // Write headers if file is new
    if !file_exists && !headers.is_empty() {
        writeln!(file, "{}", headers.join(","))?;
    }

    // Write data row
    writeln!(file, "{}", data.join(","))?;
    file.flush()?;

    Ok(())
}
