//! Library records produced by an import.

pub mod comic;
pub mod manga;

pub use comic::{ComicEntry, ComicInfo, ComicInfoBuilder, title_from_file_name};
pub use manga::{Manga, ReadingStatus};

/// Format a byte count for display (B, KB, MB, GB; integer units).
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match size {
        s if s < KB => format!("{} B", s),
        s if s < MB => format!("{} KB", s / KB),
        s if s < GB => format!("{} MB", s / MB),
        s => format!("{} GB", s / GB),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sizes_use_binary_units() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(2048), "2 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024 + 1), "5 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
    }
}
