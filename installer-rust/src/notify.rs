use crate::error::ErrorKind;

pub fn dialog_title(app_name: &str) -> String {
    format!("{app_name} Setup")
}

/// What the user sees when a run ends with `kind`.
pub fn error_text(kind: ErrorKind, detail: &str) -> String {
    let headline = match kind {
        ErrorKind::PermissionDenied => "Administrator rights are required.",
        ErrorKind::NotFound => "No installation was found.",
        ErrorKind::InvalidPackage => "The package is damaged.",
        ErrorKind::Usage => "The command line is not valid.",
        ErrorKind::Io => "A file operation failed.",
    };
    format!("{headline}\n\n{detail}\n\nExit code {}.", kind.exit_code())
}

/// The GUI build has no console, so Windows gets a message box as well.
pub fn show_error(title: &str, text: &str) {
    eprintln!("{title}: {text}");
    #[cfg(windows)]
    message_box(title, text);
}

#[cfg(windows)]
fn message_box(title: &str, text: &str) {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONERROR, MB_OK};

    let wide = |s: &str| -> Vec<u16> {
        OsStr::new(s)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    };
    let title_w = wide(title);
    let text_w = wide(text);
    unsafe {
        MessageBoxW(0, text_w.as_ptr(), title_w.as_ptr(), MB_OK | MB_ICONERROR);
    }
}
