//! Backend auth endpoint paths, relative to the API base URL.

pub const LOGIN: &str = "/auth/login";
pub const REFRESH: &str = "/auth/refresh";
pub const ME: &str = "/auth/me";
pub const CHANGE_PASSWORD: &str = "/auth/change-password";
pub const LOGOUT: &str = "/auth/logout";

/// Calls whose 401 means "bad credentials", never "token expired".
pub fn is_credential_exchange(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    path == LOGIN || path == REFRESH
}
