//! The shared graphics buffer handle and its transport envelope.
//!
//! A [`BufferHandle`] identifies one block of shared graphics memory. It is
//! created by the producing process, serialized into a flat
//! [`RawBufferHandle`] envelope, carried across a process boundary by the
//! transport layer, and re-validated on arrival before any field is trusted.
//!
//! ## Wire layout
//!
//! The envelope is `version` (the byte size of the three-word envelope
//! header), `num_fds`, `num_ints`, followed by exactly [`NUM_FDS`] file
//! descriptors and [`NUM_INTS`] integers. The integer order is fixed:
//!
//! ```text
//! magic, flags, usage, size, width, height, stride, format, color_space,
//! min_page_size, lock_state, write_owner, pid, base_lo, base_hi,
//! aux_lo, aux_hi
//! ```
//!
//! `base` is the process-local mapping address split into two words; it is
//! only meaningful between a successful registration and the matching
//! unregistration, and only inside the registering process. `aux` carries the
//! framebuffer byte offset for framebuffer-backed handles and is zero
//! otherwise. The fd slots are the shared-memory descriptor (or framebuffer
//! device descriptor) followed by the optional attribute-area descriptor,
//! with `-1` marking absence.
//!
//! A consumer receiving this layout from another process must call
//! [`BufferHandle::from_raw`]; no typed view is ever produced from an
//! envelope that fails validation.

use crate::errors::BufferError;
use bitflags::bitflags;
use std::os::unix::io::RawFd;

/// Sentinel stamped into every live handle and zeroed on destruction, so a
/// destroyed or foreign-typed handle is refused by [`BufferHandle::validate`].
pub const MAGIC: i32 = 0x4C55_4246;

/// Number of file descriptors in the transport envelope.
pub const NUM_FDS: usize = 2;

/// Integers always present in the envelope.
const BASE_NUM_INTS: usize = 15;

/// Integers added by the externally-allocated heap configuration (the `aux`
/// words).
const HEAP_NUM_INTS: usize = 2;

/// Number of integers in the transport envelope.
pub const NUM_INTS: usize = BASE_NUM_INTS + HEAP_NUM_INTS;

/// Envelope version: the byte size of the three-word envelope header.
pub const HANDLE_VERSION: i32 = (3 * std::mem::size_of::<i32>()) as i32;

bitflags! {
    /// Bit set identifying the backing storage of a buffer.
    ///
    /// [`Self::FRAMEBUFFER`] and [`Self::HEAP`] are mutually exclusive; every
    /// well-formed handle carries exactly one of them. The remaining bits
    /// qualify the heap kind and are informational to this module.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferFlags: u32 {
        /// Backed by the display controller's framebuffer memory.
        const FRAMEBUFFER   = 1 << 0;
        /// Allocated from a physically compound heap.
        const HEAP_COMPOUND = 1 << 1;
        /// Backed by the external allocator's shared heap.
        const HEAP          = 1 << 2;
        /// Allocated from a DMA-capable heap.
        const HEAP_DMA      = 1 << 3;
    }
}

bitflags! {
    /// Usage bits requested when a buffer is allocated or locked.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UsageFlags: u32 {
        /// CPU will read the buffer contents.
        const CPU_READ          = 1 << 0;
        /// CPU will write the buffer contents.
        const CPU_WRITE         = 1 << 1;
        /// Sampled as a texture by the GPU.
        const GPU_TEXTURE       = 1 << 4;
        /// Rendered to by the GPU.
        const GPU_RENDER_TARGET = 1 << 5;
        /// Scanned out by the display controller.
        const DISPLAY           = 1 << 8;
        /// Any CPU access.
        const CPU_ACCESS = Self::CPU_READ.bits() | Self::CPU_WRITE.bits();
    }
}

/// Lock-state bitfield of a handle.
///
/// Bit 31 marks a write lock, bit 30 marks an established mapping, and the
/// low 30 bits count outstanding readers. The counter is bookkeeping owned by
/// the buffer's users; the module itself only consults it for the
/// still-locked diagnostic during unregistration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockState(u32);

impl LockState {
    /// A write lock is held.
    pub const WRITE: u32 = 1 << 31;
    /// The buffer is mapped in this process.
    pub const MAPPED: u32 = 1 << 30;
    /// Mask of the outstanding-reader count.
    pub const READ_MASK: u32 = 0x3FFF_FFFF;

    pub fn from_bits(bits: u32) -> Self {
        LockState(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_mapped(self) -> bool {
        self.0 & Self::MAPPED != 0
    }

    pub fn has_write(self) -> bool {
        self.0 & Self::WRITE != 0
    }

    pub fn reader_count(self) -> u32 {
        self.0 & Self::READ_MASK
    }

    pub fn has_readers(self) -> bool {
        self.reader_count() != 0
    }

    pub fn set_mapped(&mut self) {
        self.0 |= Self::MAPPED;
    }

    /// Resets the whole bitfield, readers included.
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

/// Color-space tag carried alongside the pixel format.
///
/// Descriptive only; this module never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ColorSpace {
    NoInfo = 0,
    Bt601Narrow = 1,
    Bt601Wide = 2,
    Bt709Narrow = 3,
    Bt709Wide = 4,
}

impl ColorSpace {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(ColorSpace::NoInfo),
            1 => Some(ColorSpace::Bt601Narrow),
            2 => Some(ColorSpace::Bt601Wide),
            3 => Some(ColorSpace::Bt709Narrow),
            4 => Some(ColorSpace::Bt709Wide),
            _ => None,
        }
    }
}

/// Per-backing payload of a handle.
///
/// A buffer is either framebuffer-backed or heap-backed, never both; the
/// variant carries exactly the descriptors that backing kind needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backing {
    /// Pre-mapped display memory: the framebuffer device descriptor and the
    /// byte offset of this buffer within the display surface.
    Framebuffer { device_fd: RawFd, offset: i64 },
    /// Externally allocated shared heap memory: the shared-memory descriptor
    /// and an optional descriptor for the auxiliary attribute area.
    Heap {
        share_fd: RawFd,
        attr_fd: Option<RawFd>,
    },
}

/// The flat, serializable transport envelope of a buffer handle.
///
/// This is what actually crosses the process boundary. The receiving side
/// must re-validate it via [`BufferHandle::from_raw`] before trusting any
/// field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBufferHandle {
    pub version: i32,
    pub num_fds: i32,
    pub num_ints: i32,
    pub fds: Vec<RawFd>,
    pub ints: Vec<i32>,
}

impl RawBufferHandle {
    /// Checks the envelope shape: declared counts must equal this module's
    /// fixed constants and match the actual array lengths. A mismatch means
    /// the bytes did not originate from this module or were corrupted in
    /// transit.
    pub fn validate(&self) -> Result<(), BufferError> {
        if self.version != HANDLE_VERSION
            || self.num_fds != NUM_FDS as i32
            || self.num_ints != NUM_INTS as i32
            || self.fds.len() != NUM_FDS
            || self.ints.len() != NUM_INTS
        {
            return Err(BufferError::InvalidHandle);
        }
        Ok(())
    }
}

/// The typed descriptor of one shared graphics buffer.
///
/// Geometry and format fields are descriptive metadata populated by the
/// producer; this module treats the buffer as an opaque memory region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferHandle {
    /// Envelope header, kept with the handle so validation can compare it
    /// against the module constants.
    pub version: i32,
    pub num_fds: i32,
    pub num_ints: i32,

    /// Validity sentinel; [`MAGIC`] while the handle is alive.
    pub magic: i32,
    /// Backing-storage identification bits.
    pub flags: BufferFlags,
    /// Usage requested at allocation time.
    pub usage: UsageFlags,
    /// Size of the backing memory in bytes.
    pub size: i32,
    pub width: i32,
    pub height: i32,
    pub stride: i32,
    /// Opaque pixel format code.
    pub format: i32,
    pub color_space: ColorSpace,
    /// Minimum physical page size backing this buffer.
    pub min_page_size: i32,

    /// Process-local mapping address. Valid only between registration and
    /// unregistration, and only in the registering process.
    pub base: u64,
    pub lock_state: LockState,
    /// Whether the most recent lock requested CPU write access.
    pub write_owner: bool,
    /// Process that performed the mapping; only it may unregister.
    pub pid: i32,

    /// Per-backing descriptors.
    pub backing: Backing,
}

impl BufferHandle {
    /// Creates a descriptor for a buffer carved out of the external
    /// allocator's shared heap. Geometry fields start zeroed and are filled
    /// in by the producer.
    pub fn new_heap(share_fd: RawFd, attr_fd: Option<RawFd>, usage: UsageFlags, size: i32) -> Self {
        Self::new(
            BufferFlags::HEAP,
            usage,
            size,
            Backing::Heap { share_fd, attr_fd },
        )
    }

    /// Creates a descriptor for a slice of the pre-mapped framebuffer.
    /// Such handles are never registered through this module; the display
    /// subsystem owns their mapping.
    pub fn new_framebuffer(device_fd: RawFd, offset: i64, usage: UsageFlags, size: i32) -> Self {
        Self::new(
            BufferFlags::FRAMEBUFFER,
            usage,
            size,
            Backing::Framebuffer { device_fd, offset },
        )
    }

    fn new(flags: BufferFlags, usage: UsageFlags, size: i32, backing: Backing) -> Self {
        BufferHandle {
            version: HANDLE_VERSION,
            num_fds: NUM_FDS as i32,
            num_ints: NUM_INTS as i32,
            magic: MAGIC,
            flags,
            usage,
            size,
            width: 0,
            height: 0,
            stride: 0,
            format: 0,
            color_space: ColorSpace::NoInfo,
            min_page_size: 0,
            base: 0,
            lock_state: LockState::default(),
            write_owner: false,
            pid: std::process::id() as i32,
            backing,
        }
    }

    /// Succeeds only if the envelope header and the magic sentinel all match
    /// this module's constants. Checked before every operation that
    /// dereferences the descriptor; any single mismatch fails it.
    pub fn validate(&self) -> Result<(), BufferError> {
        if self.version != HANDLE_VERSION
            || self.num_fds != NUM_FDS as i32
            || self.num_ints != NUM_INTS as i32
            || self.magic != MAGIC
        {
            return Err(BufferError::InvalidHandle);
        }
        Ok(())
    }

    /// The typed-access entry point for envelopes received from another
    /// process: produces a [`BufferHandle`] only if the envelope and magic
    /// validate, and the flags name exactly one backing kind. No partial
    /// view is ever returned.
    pub fn from_raw(raw: &RawBufferHandle) -> Result<Self, BufferError> {
        raw.validate()?;

        let ints = &raw.ints;
        if ints[0] != MAGIC {
            return Err(BufferError::InvalidHandle);
        }

        let flags = BufferFlags::from_bits_retain(ints[1] as u32);
        let is_framebuffer = flags.contains(BufferFlags::FRAMEBUFFER);
        let is_heap = flags.contains(BufferFlags::HEAP);
        let aux = join_words(ints[15], ints[16]);
        let backing = match (is_framebuffer, is_heap) {
            (true, false) => Backing::Framebuffer {
                device_fd: raw.fds[0],
                offset: aux as i64,
            },
            (false, true) => Backing::Heap {
                share_fd: raw.fds[0],
                attr_fd: (raw.fds[1] >= 0).then_some(raw.fds[1]),
            },
            _ => return Err(BufferError::UnsupportedConfiguration { flags }),
        };

        Ok(BufferHandle {
            version: raw.version,
            num_fds: raw.num_fds,
            num_ints: raw.num_ints,
            magic: ints[0],
            flags,
            usage: UsageFlags::from_bits_retain(ints[2] as u32),
            size: ints[3],
            width: ints[4],
            height: ints[5],
            stride: ints[6],
            format: ints[7],
            color_space: ColorSpace::from_i32(ints[8]).unwrap_or(ColorSpace::NoInfo),
            min_page_size: ints[9],
            lock_state: LockState::from_bits(ints[10] as u32),
            write_owner: ints[11] != 0,
            pid: ints[12],
            base: join_words(ints[13], ints[14]),
            backing,
        })
    }

    /// Serializes the handle into its bit-exact transport envelope.
    pub fn to_raw(&self) -> RawBufferHandle {
        let (primary_fd, secondary_fd, aux) = match self.backing {
            Backing::Framebuffer { device_fd, offset } => (device_fd, -1, offset as u64),
            Backing::Heap { share_fd, attr_fd } => (share_fd, attr_fd.unwrap_or(-1), 0),
        };

        let (base_lo, base_hi) = split_words(self.base);
        let (aux_lo, aux_hi) = split_words(aux);

        RawBufferHandle {
            version: self.version,
            num_fds: self.num_fds,
            num_ints: self.num_ints,
            fds: vec![primary_fd, secondary_fd],
            ints: vec![
                self.magic,
                self.flags.bits() as i32,
                self.usage.bits() as i32,
                self.size,
                self.width,
                self.height,
                self.stride,
                self.format,
                self.color_space as i32,
                self.min_page_size,
                self.lock_state.bits() as i32,
                self.write_owner as i32,
                self.pid,
                base_lo,
                base_hi,
                aux_lo,
                aux_hi,
            ],
        }
    }

    /// True for buffers whose backing memory is physically contiguous, which
    /// is exactly the framebuffer-backed kind.
    pub fn is_physically_contiguous(&self) -> bool {
        self.flags.contains(BufferFlags::FRAMEBUFFER)
    }

    /// The shared-memory descriptor, for heap-backed handles.
    pub fn heap_share_fd(&self) -> Option<RawFd> {
        match self.backing {
            Backing::Heap { share_fd, .. } => Some(share_fd),
            Backing::Framebuffer { .. } => None,
        }
    }
}

impl Drop for BufferHandle {
    fn drop(&mut self) {
        // A dangling copy of a destroyed handle must not validate.
        self.magic = 0;
    }
}

fn split_words(value: u64) -> (i32, i32) {
    (value as u32 as i32, (value >> 32) as u32 as i32)
}

fn join_words(lo: i32, hi: i32) -> u64 {
    u64::from(lo as u32) | (u64::from(hi as u32) << 32)
}
