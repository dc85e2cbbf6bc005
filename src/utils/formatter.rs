// Formatters - 진행률, 카운터, 크기, 권한 포맷팅

use chrono::{DateTime, Local};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 진행률 (0-100, 내림)
///
/// `total`이 0이면 1로 간주한다.
///
/// # Examples
/// ```
/// use twinpane::utils::formatter::percent;
///
/// assert_eq!(percent(0, 10), 0);
/// assert_eq!(percent(1, 3), 33);
/// assert_eq!(percent(10, 10), 100);
/// assert_eq!(percent(0, 0), 0);
/// ```
pub fn percent(done: u64, total: u64) -> u8 {
    let total = total.max(1);
    let value = done.saturating_mul(100) / total;
    value.min(100) as u8
}

/// "처리/전체" 카운터 문자열
///
/// # Examples
/// ```
/// use twinpane::utils::formatter::format_counter;
///
/// assert_eq!(format_counter(3, 10), "3/10");
/// ```
pub fn format_counter(done: usize, total: usize) -> String {
    format!("{}/{}", done, total)
}

/// 파일 크기를 읽기 쉬운 형식으로 포맷팅 (숫자와 단위 사이 공백)
///
/// # Examples
/// ```
/// use twinpane::utils::formatter::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 B");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    }
}

/// 수정 시간을 "YYYY-MM-DD HH:MM" 형식으로 포맷팅
pub fn format_date(time: SystemTime) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%Y-%m-%d %H:%M").to_string()
}

/// unix epoch 초를 `format_date` 형식으로 (음수는 epoch로)
pub fn format_epoch(secs: i64) -> String {
    format_date(UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64))
}

/// Unix 모드를 rwxr-xr-x 형식으로 변환 (setuid/setgid/sticky 포함)
///
/// # Examples
/// ```
/// use twinpane::utils::formatter::format_mode;
///
/// assert_eq!(format_mode(0o755), "rwxr-xr-x");
/// assert_eq!(format_mode(0o1777), "rwxrwxrwt");
/// ```
pub fn format_mode(mode: u32) -> String {
    const FLAGS: [char; 3] = ['r', 'w', 'x'];
    let mut out: Vec<char> = (0..9)
        .map(|i| {
            if mode & (0o400 >> i) != 0 {
                FLAGS[i % 3]
            } else {
                '-'
            }
        })
        .collect();
    if mode & 0o4000 != 0 {
        out[2] = 's';
    }
    if mode & 0o2000 != 0 {
        out[5] = 's';
    }
    if mode & 0o1000 != 0 {
        out[8] = 't';
    }
    out.into_iter().collect()
}

/// 화면 폭에 맞게 문자열 자르기 (유니코드 폭 기준)
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthChar;

    let mut width = 0usize;
    let mut out = String::new();
    for c in text.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw > max_width {
            break;
        }
        width += cw;
        out.push(c);
    }
    out
}
