/// Identifier for the bug tracker a record came from.
/// Examples: `Eclipse`, `KDE`, `LibreOffice`
pub type SourceId = String;
/// Raw cell text as read from or written to a tabular file.
/// Examples: `P3`, `12`, `Crash when saving`
pub type CellValue = String;
/// Concatenated comment bodies for one bug.
/// Example: `First comment\n\nSecond comment`
pub type CommentText = String;
/// Key mixed into the seed to derive an independent random stream.
/// Examples: `validation_test|KDE|1`, `train|2000|Eclipse|0`
pub type StreamKey = String;
