use chrono::{Local, Timelike as _};
use lingo_core::{Handler, Invocation, Result};
use std::io::{self, ErrorKind};
use std::process::Command;
use std::sync::Arc;

/// Registry name of the clock handler.
pub const TIME_HANDLER: &str = "time";
/// Registry name of the application launcher.
pub const APPLICATION_HANDLER: &str = "application";
/// Registry name of the help handler.
pub const HELP_HANDLER: &str = "help";

/// Leading words stripped from a launch request, longest first.
const LAUNCH_PREFIXES: [&str; 12] = [
    "khởi động ứng dụng",
    "chạy ứng dụng",
    "mở ứng dụng",
    "launch app",
    "open app",
    "khởi động",
    "ứng dụng",
    "launch",
    "open",
    "chạy",
    "app",
    "mở",
];

/// Friendly names and the executables they start.
const APP_ALIASES: [(&str, &str); 16] = [
    ("calculator", "calc.exe"),
    ("máy tính", "calc.exe"),
    ("tính toán", "calc.exe"),
    ("paint", "mspaint.exe"),
    ("vẽ", "mspaint.exe"),
    ("wordpad", "write.exe"),
    ("soạn thảo", "write.exe"),
    ("chrome", "chrome.exe"),
    ("trình duyệt", "chrome.exe"),
    ("firefox", "firefox.exe"),
    ("edge", "msedge.exe"),
    ("excel", "excel.exe"),
    ("word", "winword.exe"),
    ("powerpoint", "powerpnt.exe"),
    ("notepad", "notepad.exe"),
    ("ghi chú", "notepad.exe"),
];

/// Characters `cmd.exe` treats as command separators, redirections or expansions.
const SHELL_METACHARACTERS: [char; 9] = ['&', '|', '<', '>', '^', '%', '"', '(', ')'];

/// Whether `name` can be handed to the shell launcher as a single program name.
#[must_use]
pub fn is_launchable_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|ch| SHELL_METACHARACTERS.contains(&ch) || ch.is_control())
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

/// Reports the local wall-clock time as `Bây giờ là H:MM`.
pub struct TimeHandler;

impl Handler for TimeHandler {
    fn handle(&self, _invocation: &Invocation) -> Result<String> {
        let now = Local::now();
        Ok(format!("Bây giờ là {}:{:02}", now.hour(), now.minute()))
    }

    fn keywords(&self) -> Vec<String> {
        strings(&["giờ", "thời gian", "time"])
    }

    fn patterns(&self) -> Vec<String> {
        strings(&["mấy giờ rồi", "bây giờ là mấy giờ"])
    }
}

/// Starts an executable on behalf of the application handler.
pub trait AppLauncher: Send + Sync {
    /// Launches `executable` without waiting for it.
    ///
    /// # Errors
    /// Returns [`ErrorKind::Unsupported`] on platforms without a launcher, or the
    /// underlying spawn error.
    fn launch(&self, executable: &str) -> io::Result<()>;
}

/// Launches through the Windows shell; unsupported elsewhere.
pub struct SystemLauncher;

impl AppLauncher for SystemLauncher {
    fn launch(&self, executable: &str) -> io::Result<()> {
        if !is_launchable_name(executable) {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("'{executable}' is not a plain program name"),
            ));
        }
        if !cfg!(windows) {
            return Err(io::Error::new(
                ErrorKind::Unsupported,
                "application launching requires Windows",
            ));
        }
        Command::new("cmd")
            .args(["/C", "start", "", executable])
            .spawn()
            .map(drop)
    }
}

/// Opens the application named after the launch keyword.
pub struct ApplicationHandler {
    launcher: Arc<dyn AppLauncher>,
}

impl ApplicationHandler {
    /// Handler that starts programs through `launcher`.
    #[must_use]
    pub fn new(launcher: Arc<dyn AppLauncher>) -> Self {
        Self { launcher }
    }

    /// Strips launch words from the front of `parameter`, leaving the application name.
    #[must_use]
    pub fn application_name(parameter: &str) -> String {
        let mut name = parameter
            .trim()
            .trim_matches(|ch: char| ch.is_ascii_punctuation())
            .to_lowercase();
        loop {
            let stripped = LAUNCH_PREFIXES.iter().find_map(|prefix| {
                name.strip_prefix(prefix)
                    .filter(|rest| rest.is_empty() || rest.starts_with(' '))
                    .map(|rest| rest.trim().to_owned())
            });
            match stripped {
                Some(rest) => name = rest,
                None => return name,
            }
        }
    }

    fn executable_for(name: &str) -> String {
        APP_ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map_or_else(|| name.to_owned(), |(_, executable)| (*executable).to_owned())
    }
}

impl Handler for ApplicationHandler {
    fn handle(&self, invocation: &Invocation) -> Result<String> {
        let name = Self::application_name(&invocation.parameter);
        if name.is_empty() {
            return Ok("Bạn muốn mở ứng dụng nào?".to_owned());
        }

        if !is_launchable_name(&name) {
            tracing::warn!("Refusing to launch '{name}'");
            return Ok(format!("Tên ứng dụng không hợp lệ: {name}"));
        }

        let executable = Self::executable_for(&name);
        tracing::debug!("Launching '{executable}' for '{name}'");
        Ok(match self.launcher.launch(&executable) {
            Ok(()) => format!("Đã mở ứng dụng {name}."),
            Err(error) if error.kind() == ErrorKind::Unsupported => {
                "Chức năng này chỉ hỗ trợ Windows.".to_owned()
            }
            Err(error) => format!("Lỗi khi mở ứng dụng {name}: {error}"),
        })
    }

    fn keywords(&self) -> Vec<String> {
        strings(&["mở", "khởi động", "chạy"])
    }

    fn patterns(&self) -> Vec<String> {
        strings(&["mở máy tính", "mở trình duyệt", "mở notepad"])
    }
}

/// Lists what the assistant can do.
pub struct HelpHandler;

impl Handler for HelpHandler {
    fn handle(&self, _invocation: &Invocation) -> Result<String> {
        Ok([
            "Tôi có thể giúp bạn:",
            "- Xem giờ: \"mấy giờ rồi\"",
            "- Mở ứng dụng: \"mở notepad\", \"mở máy tính\"",
            "- Tính toán: \"tính 5 + 3\"",
            "- Hỏi trợ lý AI: \"hỏi chatgpt thủ đô của Pháp\"",
        ]
        .join("\n"))
    }

    fn keywords(&self) -> Vec<String> {
        strings(&["trợ giúp", "help"])
    }

    fn patterns(&self) -> Vec<String> {
        strings(&["bạn làm được gì", "hướng dẫn sử dụng"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingo_core::IgnoreLock as _;
    use regex::Regex;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLauncher {
        launched: Mutex<Vec<String>>,
    }

    impl AppLauncher for RecordingLauncher {
        fn launch(&self, executable: &str) -> io::Result<()> {
            self.launched.lock_ignore_poison().push(executable.to_owned());
            Ok(())
        }
    }

    struct FailingLauncher(ErrorKind);

    impl AppLauncher for FailingLauncher {
        fn launch(&self, _executable: &str) -> io::Result<()> {
            Err(io::Error::new(self.0, "boom"))
        }
    }

    #[test]
    fn test_time_format() {
        let output = TimeHandler
            .handle(&Invocation::default())
            .expect("time never fails");
        let pattern = Regex::new(r"^Bây giờ là \d{1,2}:\d{2}$").expect("valid regex");
        assert!(pattern.is_match(&output), "unexpected output: {output}");
    }

    #[test]
    fn test_application_name_strips_launch_words() {
        assert_eq!(ApplicationHandler::application_name("mở ứng dụng Notepad"), "notepad");
        assert_eq!(ApplicationHandler::application_name("máy tính"), "máy tính");
        assert_eq!(ApplicationHandler::application_name("open chrome."), "chrome");
        assert_eq!(ApplicationHandler::application_name("mở"), "");
        assert_eq!(ApplicationHandler::application_name("mởrộng"), "mởrộng");
    }

    #[test]
    fn test_application_maps_aliases() {
        let launcher = Arc::new(RecordingLauncher::default());
        let handler = ApplicationHandler::new(Arc::clone(&launcher) as Arc<dyn AppLauncher>);

        let output = handler
            .handle(&Invocation::new("máy tính"))
            .expect("launch succeeds");
        assert_eq!(output, "Đã mở ứng dụng máy tính.");

        let output = handler
            .handle(&Invocation::new("spotify"))
            .expect("launch succeeds");
        assert_eq!(output, "Đã mở ứng dụng spotify.");
        assert_eq!(
            *launcher.launched.lock_ignore_poison(),
            vec!["calc.exe".to_owned(), "spotify".to_owned()]
        );
    }

    #[test]
    fn test_application_without_name_asks() {
        let handler = ApplicationHandler::new(Arc::new(RecordingLauncher::default()));
        let output = handler.handle(&Invocation::new("")).expect("no failure");
        assert_eq!(output, "Bạn muốn mở ứng dụng nào?");
    }

    #[test]
    fn test_application_launch_failures() {
        let unsupported = ApplicationHandler::new(Arc::new(FailingLauncher(ErrorKind::Unsupported)));
        assert_eq!(
            unsupported.handle(&Invocation::new("notepad")).expect("message"),
            "Chức năng này chỉ hỗ trợ Windows."
        );

        let missing = ApplicationHandler::new(Arc::new(FailingLauncher(ErrorKind::NotFound)));
        let output = missing.handle(&Invocation::new("notepad")).expect("message");
        assert!(output.starts_with("Lỗi khi mở ứng dụng notepad:"));
    }

    #[test]
    fn test_application_rejects_shell_metacharacters() {
        let launcher = Arc::new(RecordingLauncher::default());
        let handler = ApplicationHandler::new(Arc::clone(&launcher) as Arc<dyn AppLauncher>);

        for request in ["mở notepad&calc", "mở notepad|calc", "open a>b", "mở notepad^calc"] {
            let output = handler.handle(&Invocation::new(request)).expect("message");
            assert!(
                output.starts_with("Tên ứng dụng không hợp lệ:"),
                "unexpected output for {request}: {output}"
            );
        }
        assert!(launcher.launched.lock_ignore_poison().is_empty());
    }

    #[test]
    fn test_system_launcher_refuses_command_chains() {
        let error = SystemLauncher
            .launch("notepad&calc")
            .expect_err("chained command refused");
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
        assert!(is_launchable_name("notepad.exe"));
        assert!(is_launchable_name("máy tính"));
        assert!(!is_launchable_name("calc^"));
        assert!(!is_launchable_name(""));
    }
}
