use anyhow::Result;

use crate::error::SetupError;

/// Whether the current process runs with administrator rights.
pub fn is_elevated() -> bool {
    #[cfg(windows)]
    {
        windows_admin::check_admin()
    }
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(any(windows, unix)))]
    {
        false
    }
}

/// Precondition shared by install and uninstall, checked before any mutation.
pub fn ensure_elevated(elevated: bool, action: &str) -> Result<()> {
    if !elevated {
        return Err(SetupError::PermissionDenied(format!(
            "{action} requires administrator rights"
        ))
        .into());
    }
    Ok(())
}

#[cfg(windows)]
mod windows_admin {
    use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
    use windows_sys::Win32::Security::{
        GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY,
    };
    use windows_sys::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    pub fn check_admin() -> bool {
        unsafe {
            let mut token: HANDLE = 0;
            if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) == 0 {
                return false;
            }

            let mut elevation = TOKEN_ELEVATION { TokenIsElevated: 0 };
            let mut return_length = 0u32;
            let ok = GetTokenInformation(
                token,
                TokenElevation,
                &mut elevation as *mut TOKEN_ELEVATION as *mut _,
                std::mem::size_of::<TOKEN_ELEVATION>() as u32,
                &mut return_length,
            );

            CloseHandle(token);
            ok != 0 && elevation.TokenIsElevated != 0
        }
    }
}
