use std::time::Duration;

use super::model::Track;

impl Track {
    /// `"Artist - Title"`, or just the title when there is no artist.
    pub fn display(&self) -> String {
        match self.artist.as_deref().map(str::trim) {
            Some(a) if !a.is_empty() => format!("{} - {}", a, self.title.trim()),
            _ => self.title.trim().to_string(),
        }
    }

    /// Estimated bitrate rounded up to a multiple of 16 kbps.
    pub fn bitrate_kbps(&self) -> Option<u64> {
        let size = self.size?;
        let secs = self.duration?.as_secs_f64();
        if size == 0 || secs <= 0.0 {
            return None;
        }
        let kbit = (size / 128) as f64;
        let kbps = ((kbit / secs).round() / 16.0).ceil() * 16.0;
        Some(kbps as u64)
    }

    /// Creation date as `"Nov 17, 2024 at 14:05"`.
    pub fn created_formatted(&self) -> Option<String> {
        self.created_at
            .map(|d| d.format("%b %d, %Y at %H:%M").to_string())
    }

    /// Human-friendly size, e.g. `"4.2 MB"`.
    pub fn size_formatted(&self) -> Option<String> {
        self.size.map(format_bytes)
    }

    /// The `(label, value)` rows shown in the details popup.
    pub fn details(&self) -> Vec<(&'static str, String)> {
        let dash = || "-".to_string();
        vec![
            ("Format", self.file_extension.clone().unwrap_or_else(dash)),
            (
                "Duration",
                self.duration.map(format_mmss).unwrap_or_else(dash),
            ),
            (
                "Bitrate",
                self.bitrate_kbps()
                    .map(|k| format!("{k} Kbps"))
                    .unwrap_or_else(dash),
            ),
            ("Size", self.size_formatted().unwrap_or_else(dash)),
            ("Created", self.created_formatted().unwrap_or_else(dash)),
        ]
    }
}

/// Format a `Duration` as `MM:SS`.
pub fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} bytes")
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
