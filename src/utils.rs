use std::io;

const NO_CHILD_MESSAGE: &str = "no child processes";

/// Whether a release error only says the process was already reaped.
///
/// Errors carrying an OS code are judged by `ECHILD` alone. The message
/// match is a fallback for errors built without one, and depends on the
/// English strerror text.
pub(crate) fn is_no_child(error: &io::Error) -> bool {
    match error.raw_os_error() {
        Some(code) => code == libc::ECHILD,
        None => error.to_string().to_ascii_lowercase().contains(NO_CHILD_MESSAGE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echild_is_benign() {
        assert!(is_no_child(&io::Error::from_raw_os_error(libc::ECHILD)));
        assert!(is_no_child(&io::Error::from(nix::errno::Errno::ECHILD)));
    }

    #[test]
    fn other_os_errors_are_not() {
        assert!(!is_no_child(&io::Error::from_raw_os_error(libc::EPERM)));
        assert!(!is_no_child(&io::Error::from_raw_os_error(libc::EINTR)));
    }

    #[test]
    fn message_fallback() {
        let benign = io::Error::new(io::ErrorKind::Other, "waitid: no child processes");
        let other = io::Error::new(io::ErrorKind::Other, "waitid: interrupted");

        assert!(is_no_child(&benign));
        assert!(!is_no_child(&other));
    }
}
