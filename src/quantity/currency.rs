quantity!(Dollars, suffix: "$", precision: 2);

impl Dollars {
    pub const ONE_CENT: Self = Self(0.01);
}
