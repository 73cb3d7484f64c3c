//! The tape-emulating device state machine.

use crate::erase::{delete_volume, SecureEraser, ZeroFillEraser};
use crate::gather::gather;
use crate::scatter::scatter;
use std::path::{Path, PathBuf};
use tapevault_common::{DeviceConfig, DeviceOptions, Position, Result, VaultError};
use tapevault_volume::{OpenMode, Volume, VolumeOpener};
use tracing::{debug, warn};

/// Token identifying one open of the device.
///
/// Each successful [`DedupDevice::open`] mints a fresh handle and
/// invalidates all earlier ones, so an I/O call made with a handle
/// from a previous open is rejected instead of silently touching a
/// different volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(u64);

impl DeviceHandle {
    /// Raw handle value, for diagnostics.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A sequential tape-style device backed by a dedup volume.
///
/// The device presents the classic tape contract to its caller: a
/// (file, block) position, an end-of-data flag, mount state, and
/// whole-block reads and writes. Underneath, each block is scattered
/// into a content volume and gathered back on read, so the caller
/// sees byte-identical blocks while the volume stores record payloads
/// apart from their framing.
///
/// Writes are append-only: the device only accepts a block at the
/// position right after the last committed block. The single exception
/// is re-labeling, where position zero may overwrite a volume that
/// holds exactly one block (a fresh label).
pub struct DedupDevice<O: VolumeOpener> {
    config: DeviceConfig,
    opener: O,
    eraser: Box<dyn SecureEraser>,

    volume: Option<O::Vol>,
    handle_ctr: u64,
    block_size: usize,

    mounted: bool,
    pos: Position,
    eot: bool,
}

impl<O: VolumeOpener> DedupDevice<O> {
    /// Creates a closed, unmounted device using the zero-fill eraser.
    pub fn new(config: DeviceConfig, opener: O) -> Self {
        Self::with_eraser(config, opener, Box::new(ZeroFillEraser))
    }

    /// Creates a device with a custom secure-erase strategy.
    pub fn with_eraser(config: DeviceConfig, opener: O, eraser: Box<dyn SecureEraser>) -> Self {
        Self {
            config,
            opener,
            eraser,
            volume: None,
            handle_ctr: 0,
            block_size: 0,
            mounted: false,
            pos: Position::START,
            eot: false,
        }
    }

    /// Marks the device mounted. Returns whether the state changed.
    pub fn mount(&mut self) -> bool {
        !std::mem::replace(&mut self.mounted, true)
    }

    /// Marks the device unmounted. Returns whether the state changed.
    pub fn unmount(&mut self) -> bool {
        std::mem::replace(&mut self.mounted, false)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_open(&self) -> bool {
        self.volume.is_some()
    }

    /// Current (file, block) position.
    pub fn position(&self) -> Position {
        self.pos
    }

    /// Whether the device sits at the end of recorded data.
    pub fn at_end_of_data(&self) -> bool {
        self.eot
    }

    /// Opens the volume at `path` and returns the handle for this open.
    ///
    /// `options` is the comma-separated device option string; passing
    /// `None` is fatal. Unknown option keys and a missing `blocksize`
    /// only produce warnings. A volume that comes up unhealthy is
    /// discarded and the open fails.
    pub fn open(
        &mut self,
        path: &Path,
        mode: OpenMode,
        permissions: u32,
        options: Option<&str>,
    ) -> Result<DeviceHandle> {
        if self.volume.is_some() {
            return Err(VaultError::VolumeAlreadyOpen);
        }
        let Some(options) = options else {
            return Err(VaultError::MissingOptions);
        };

        let opts = DeviceOptions::parse(options)?;
        for warning in &opts.warnings {
            warn!(device_options = options, "{}", warning);
        }

        let vol = self
            .opener
            .open_volume(path, mode, permissions, opts.block_size)?;
        if !vol.is_ok() {
            return Err(VaultError::VolumeCorrupted {
                reason: format!("volume {} failed to open cleanly", path.display()),
            });
        }

        self.block_size = opts.block_size;
        self.volume = Some(vol);
        self.handle_ctr += 1;
        debug!(path = %path.display(), handle = self.handle_ctr, "volume opened");
        Ok(DeviceHandle(self.handle_ctr))
    }

    /// Closes the open volume.
    pub fn close(&mut self, handle: DeviceHandle) -> Result<()> {
        self.check_handle(handle)?;
        self.volume = None;
        Ok(())
    }

    /// Writes one wire block at the current position.
    ///
    /// Any write attempt moves the device to end-of-data, even a
    /// rejected one. Returns the number of bytes consumed.
    pub fn write(&mut self, handle: DeviceHandle, data: &[u8]) -> Result<usize> {
        self.check_handle(handle)?;
        let vol = match self.volume.as_mut() {
            Some(vol) => vol,
            None => return Err(VaultError::NoOpenVolume),
        };

        self.eot = true;

        let current = self.pos.as_block_number();
        if current == 0 && vol.size() == 1 {
            // Re-labeling: the only permitted overwrite is replacing a
            // volume that holds nothing but its label block.
            vol.reset()?;
        }
        if current != vol.size() {
            return Err(VaultError::NotAtEnd {
                position: current,
                size: vol.size(),
            });
        }

        scatter(vol, data)
    }

    /// Reads the block at the current position into `out`.
    ///
    /// Returns the number of bytes produced. After a successful read
    /// the end-of-data flag reports whether that block was the last
    /// one committed.
    pub fn read(&mut self, handle: DeviceHandle, out: &mut [u8]) -> Result<usize> {
        self.check_handle(handle)?;
        let vol = match self.volume.as_ref() {
            Some(vol) => vol,
            None => return Err(VaultError::NoOpenVolume),
        };

        let block = self.pos.as_block_number();
        let n = gather(vol, block, out)?;
        self.eot = block + 1 == vol.size();
        Ok(n)
    }

    /// Moves the device to `(file, block)`.
    ///
    /// The target is not validated against recorded data; reading from
    /// a hole fails at read time instead.
    pub fn reposition(&mut self, file: u32, block: u32) -> Result<()> {
        let vol = match self.volume.as_ref() {
            Some(vol) => vol,
            None => return Err(VaultError::NoOpenVolume),
        };

        let target = Position::new(file, block);
        debug!(from = %self.pos, to = %target, "reposition");
        self.pos = target;
        self.eot = target.as_block_number() == vol.size();
        self.position_changed()
    }

    /// Rewinds to the beginning of the medium.
    pub fn rewind(&mut self) -> Result<()> {
        let vol = match self.volume.as_ref() {
            Some(vol) => vol,
            None => return Err(VaultError::NoOpenVolume),
        };

        self.pos = Position::START;
        self.eot = vol.size() == 0;
        self.position_changed()
    }

    /// Moves to the position right after the last committed block.
    pub fn seek_to_end(&mut self) -> Result<()> {
        let vol = match self.volume.as_ref() {
            Some(vol) => vol,
            None => return Err(VaultError::NoOpenVolume),
        };

        self.pos = Position::from_block_number(vol.size());
        self.eot = true;
        self.position_changed()
    }

    /// Flushes volume state to stable storage.
    pub fn flush(&mut self) -> Result<()> {
        match self.volume.as_mut() {
            Some(vol) => vol.flush(),
            None => Err(VaultError::NoOpenVolume),
        }
    }

    /// Discards all recorded data.
    ///
    /// Without the secure-erase policy the volume is reset in place.
    /// With it, the volume is closed, its files are securely erased
    /// and the directory removed, and a fresh volume is created at the
    /// same path with the same permissions and block size. If any of
    /// those steps fail the device is left with no open volume.
    pub fn truncate(&mut self) -> Result<()> {
        let vol = match self.volume.as_mut() {
            Some(vol) => vol,
            None => return Err(VaultError::NoOpenVolume),
        };

        if !self.config.secure_erase {
            return vol.reset();
        }

        let path: PathBuf = vol.path().to_path_buf();
        let permissions = vol.permissions();

        self.volume = None;
        delete_volume(&path, self.eraser.as_ref())?;

        let vol = self.opener.open_volume(
            &path,
            OpenMode::CreateReadWrite,
            permissions,
            self.block_size,
        )?;
        if !vol.is_ok() {
            return Err(VaultError::VolumeCorrupted {
                reason: format!("volume {} failed to open cleanly", path.display()),
            });
        }
        self.volume = Some(vol);
        Ok(())
    }

    /// Device control requests are not supported on this backend.
    pub fn ioctl(&mut self, _request: u64) -> Result<()> {
        Err(VaultError::Unsupported { op: "ioctl" })
    }

    /// Byte-granular seeking is meaningless on a block device.
    pub fn seek(&mut self, _offset: i64) -> Result<u64> {
        Err(VaultError::Unsupported { op: "seek" })
    }

    fn check_handle(&self, handle: DeviceHandle) -> Result<()> {
        if handle.0 != self.handle_ctr {
            return Err(VaultError::StaleHandle { handle: handle.0 });
        }
        if self.volume.is_none() {
            return Err(VaultError::NoOpenVolume);
        }
        Ok(())
    }

    /// Hook run after every position change. The volume holds no
    /// per-position state, so there is nothing to persist.
    fn position_changed(&mut self) -> Result<()> {
        Ok(())
    }
}
