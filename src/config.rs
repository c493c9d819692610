/// Folder under the working directory holding the original event files
pub const OLD_DIR_NAME: &str = "old";

/// Folder under the working directory holding identifier files
pub const IDS_DIR_NAME: &str = "ids";

/// Folder under the working directory receiving the rewritten output
pub const NEW_DIR_NAME: &str = "new";

/// Rewritten events, one per line
pub const NEW_EVENTS_FILE_NAME: &str = "new_events.txt";

/// Freshly minted identifiers, row-aligned with `NEW_EVENTS_FILE_NAME`
pub const NEW_IDS_FILE_NAME: &str = "new_ids.txt";

/// Buffer size for each output writer
pub const WRITER_BUFFER_SIZE: usize = 128 * 1024;

/// Width of the progress bar in columns
pub const PROGRESS_BAR_WIDTH: usize = 80;

/// Length of a canonical hyphenated UUID (8-4-4-4-12)
pub const UUID_TEXT_LEN: usize = 36;
