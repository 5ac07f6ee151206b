//! Canonical console line settings.
//!
//! Pure attribute computation, kept apart from the device so it can be
//! checked without a terminal.

use libc::cc_t;
use nix::sys::termios::{ControlFlags, InputFlags, LocalFlags, OutputFlags, Termios};

/// `_POSIX_VDISABLE` on Linux.
const DISABLED: cc_t = 0;

/// Control-key shorthand: `ctrl(b'C')` is `^C`.
const fn ctrl(key: u8) -> cc_t {
    key & 0x1f
}

/// Default control characters, indexed by `libc::V*`.
const CONTROL_CHARS: [(usize, cc_t); 17] = [
    (libc::VINTR, ctrl(b'C')),
    (libc::VQUIT, ctrl(b'\\')),
    (libc::VERASE, 0x7f),
    (libc::VKILL, ctrl(b'U')),
    (libc::VEOF, ctrl(b'D')),
    (libc::VTIME, 0),
    (libc::VMIN, 1),
    (libc::VSWTC, DISABLED),
    (libc::VSTART, ctrl(b'Q')),
    (libc::VSTOP, ctrl(b'S')),
    (libc::VSUSP, ctrl(b'Z')),
    (libc::VEOL, DISABLED),
    (libc::VREPRINT, ctrl(b'R')),
    (libc::VDISCARD, ctrl(b'O')),
    (libc::VWERASE, ctrl(b'W')),
    (libc::VLNEXT, ctrl(b'V')),
    (libc::VEOL2, DISABLED),
];

/// How the console line is set up.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    /// Canonical input with XON/XOFF flow control.
    #[default]
    Standard,
    /// Standard, plus no flow control, ignored breaks and plain CR/NL output.
    Strict,
}

/// Control flags that survive from the current settings.
fn preserved_control_flags() -> ControlFlags {
    ControlFlags::from_bits_retain(libc::CBAUD | libc::CBAUDEX)
        | ControlFlags::CSIZE
        | ControlFlags::CSTOPB
        | ControlFlags::PARENB
        | ControlFlags::PARODD
}

/// Rewrite `tty` into the canonical console configuration.
///
/// Line speed, character size, stop bits and parity are kept; everything else
/// is replaced. The result depends only on those kept bits, so applying it
/// twice is the same as applying it once.
pub fn apply_canonical(tty: &mut Termios, mode: LineMode) {
    tty.control_flags &= preserved_control_flags();
    tty.control_flags |= ControlFlags::HUPCL | ControlFlags::CLOCAL | ControlFlags::CREAD;

    for (index, value) in CONTROL_CHARS {
        if let Some(slot) = tty.control_chars.get_mut(index) {
            *slot = value;
        }
    }

    tty.input_flags = InputFlags::IGNPAR
        | InputFlags::ICRNL
        | InputFlags::IXON
        | InputFlags::IXANY
        | InputFlags::IUTF8;
    tty.output_flags = OutputFlags::OPOST | OutputFlags::ONLCR;
    tty.local_flags = LocalFlags::ISIG
        | LocalFlags::ICANON
        | LocalFlags::ECHO
        | LocalFlags::ECHOCTL
        | LocalFlags::ECHOPRT
        | LocalFlags::ECHOKE;

    if mode == LineMode::Strict {
        tty.input_flags |= InputFlags::IGNBRK;
        tty.input_flags &=
            !(InputFlags::BRKINT | InputFlags::INLCR | InputFlags::IGNCR | InputFlags::IXON);
        tty.output_flags &= !(OutputFlags::OCRNL | OutputFlags::ONLRET);
    }
}

/// An all-zero attribute set, used when the device will not report its own.
pub fn blank() -> Termios {
    // SAFETY: libc::termios is plain integers and arrays; all-zero is valid.
    let raw: libc::termios = unsafe { std::mem::zeroed() };
    Termios::from(raw)
}
