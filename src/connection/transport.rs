use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;

use crate::address::Address;
use crate::error::{ErrorKind, Result};
use crate::Marshaller;

/// A non-blocking socket connected to a D-Bus server.
pub(crate) struct Transport {
    stream: UnixStream,
}

impl Transport {
    /// Connect to the given address.
    ///
    /// Connecting itself blocks, which for local sockets is immediate.
    pub(crate) fn connect(address: &Address) -> Result<Self> {
        let stream = match address {
            Address::UnixPath(path) => UnixStream::connect(path)?,
            Address::UnixAbstract(name) => connect_abstract(name)?,
        };

        Self::from_std(stream)
    }

    /// Construct a transport from a connected stream, putting it into
    /// non-blocking mode.
    pub(crate) fn from_std(stream: UnixStream) -> Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self { stream })
    }

    /// Receive at most `n` bytes onto the end of `buf`.
    ///
    /// End of file is reported as a disconnect.
    pub(crate) fn recv_some(&mut self, buf: &mut Marshaller, n: usize) -> Result<usize> {
        let read = buf.read_from(&mut self.stream, n)?;

        if read == 0 {
            return Err(ErrorKind::Disconnected.into());
        }

        Ok(read)
    }

    /// Send as much of `bytes` as the socket accepts.
    pub(crate) fn send_some(&mut self, bytes: &[u8]) -> Result<usize> {
        let n = self.stream.write(bytes)?;

        if n == 0 && !bytes.is_empty() {
            return Err(io::Error::from(io::ErrorKind::WriteZero).into());
        }

        Ok(n)
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn connect_abstract(name: &[u8]) -> io::Result<UnixStream> {
    #[cfg(target_os = "android")]
    use std::os::android::net::SocketAddrExt;
    #[cfg(target_os = "linux")]
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let address = SocketAddr::from_abstract_name(name)?;
    UnixStream::connect_addr(&address)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn connect_abstract(_: &[u8]) -> io::Result<UnixStream> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "abstract sockets are only supported on Linux",
    ))
}

impl AsRawFd for Transport {
    #[inline]
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}
