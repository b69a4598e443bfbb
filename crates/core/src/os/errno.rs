//! Errno values and Linux constants used by the syscall surface.

/// No such file or directory.
pub const ENOENT: i64 = 2;
/// I/O error.
pub const EIO: i64 = 5;
/// Bad file descriptor.
pub const EBADF: i64 = 9;
/// Out of memory.
pub const ENOMEM: i64 = 12;
/// Permission denied.
pub const EACCES: i64 = 13;
/// Invalid argument.
pub const EINVAL: i64 = 22;
/// Function not implemented.
pub const ENOSYS: i64 = 38;

/// `openat` dirfd meaning "relative to the current working directory".
pub const AT_FDCWD: i64 = -100;

/// Open for writing only.
pub const O_WRONLY: u64 = 0o1;
/// Open for reading and writing.
pub const O_RDWR: u64 = 0o2;
/// Create the file if it does not exist.
pub const O_CREAT: u64 = 0o100;
/// Truncate on open.
pub const O_TRUNC: u64 = 0o1000;
/// Append on each write.
pub const O_APPEND: u64 = 0o2000;

/// Anonymous mapping (not backed by a file).
pub const MAP_ANONYMOUS: u64 = 0x20;
