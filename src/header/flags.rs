use bitflags::bitflags;

bitflags! {
    /// Records which optional extra headers contributed to a [`super::FileHeader`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ExtraFlags: u8 {
        /// A Unix UID/GID extra header (`0x51`) was present.
        const UNIX_UID_GID   = 0b001;
        /// A Unix permissions extra header (`0x50`) was present.
        const UNIX_PERMS     = 0b010;
        /// A Windows create/modify/access times extra header (`0x41`) was present.
        const WINDOWS_TIMES  = 0b100;
    }
}
