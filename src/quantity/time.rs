quantity!(Hours, suffix: "h", precision: 1);

impl Hours {
    /// Every series in this crate has hourly resolution.
    pub const ONE: Self = Self(1.0);
}
