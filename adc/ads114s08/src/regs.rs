use bitfield::bitfield;

/// Number of registers in the device register map.
pub const REGISTER_COUNT: usize = 18;

#[derive(Clone, Copy, Debug, PartialEq, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterAddress {
    Id = 0x00,
    Status = 0x01,
    Inpmux = 0x02,
    Pga = 0x03,
    Datarate = 0x04,
    Ref = 0x05,
    Idacmag = 0x06,
    IdacMux = 0x07,
    Vbias = 0x08,
    Sys = 0x09,
    Reserved0 = 0x0A,
    Ofcal0 = 0x0B,
    Ofcal1 = 0x0C,
    Reserved1 = 0x0D,
    Fscal0 = 0x0E,
    Fscal1 = 0x0F,
    Gpiodat = 0x10,
    Gpiocon = 0x11,
}

impl RegisterAddress {
    /// Power-on value of the register at this address.
    pub const fn reset_value(&self) -> u8 {
        match self {
            RegisterAddress::Id => 0x04,
            RegisterAddress::Status => 0x80,
            RegisterAddress::Inpmux => 0x01,
            RegisterAddress::Datarate => 0x14,
            RegisterAddress::Ref => 0x10,
            RegisterAddress::IdacMux => 0xFF,
            RegisterAddress::Sys => 0x10,
            RegisterAddress::Fscal1 => 0x40,
            _ => 0x00,
        }
    }
}

/// A register with a fixed address in the register map.
pub trait Register {
    const ADDRESS: RegisterAddress;

    fn from_value(value: u8) -> Self;
    fn value(&self) -> u8;
}

macro_rules! register {
    ($type:ident, $address:ident) => {
        impl Register for $type {
            const ADDRESS: RegisterAddress = RegisterAddress::$address;

            fn from_value(value: u8) -> Self {
                Self(value)
            }

            fn value(&self) -> u8 {
                self.0
            }
        }
    };
}

/// An analog input selectable through the input multiplexer.
#[derive(Clone, Copy, Debug, PartialEq, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Ain0 = 0x00,
    Ain1 = 0x01,
    Ain2 = 0x02,
    Ain3 = 0x03,
    Ain4 = 0x04,
    Ain5 = 0x05,
    Ain6 = 0x06,
    Ain7 = 0x07,
    Ain8 = 0x08,
    Ain9 = 0x09,
    Ain10 = 0x0A,
    Ain11 = 0x0B,
    /// Analog common, the return path for single-ended conversions.
    Common = 0x0C,
}

bitfield! {
    /// Device identification register.
    #[derive(Clone, Copy)]
    pub struct Id(u8);
    reserved, _: 7, 3;
    pub dev_id, _: 2, 0;
}
register!(Id, Id);

bitfield! {
    #[derive(Clone, Copy)]
    pub struct Status(u8);
    /// Power-on reset flag. Set on power-up, cleared by writing 0.
    pub fl_por, set_fl_por: 7;
    /// Conversion result readiness, active low.
    pub rdy_n, set_rdy_n: 6;
    /// Startup busy flag polled during initialization.
    pub busy, set_busy: 5;
    pub fl_p_railn, _: 4;
    pub fl_n_railp, _: 3;
    pub fl_n_railn, _: 2;
    pub fl_ref_l1, _: 1;
    pub fl_ref_l0, _: 0;
}
register!(Status, Status);

bitfield! {
    /// Input multiplexer: positive input in the high nibble, negative in the low.
    #[derive(Clone, Copy)]
    pub struct Inpmux(u8);
    pub muxp, set_muxp: 7, 4;
    pub muxn, set_muxn: 3, 0;
}
register!(Inpmux, Inpmux);

impl Inpmux {
    /// Selected positive input, or None for a reserved mux value.
    pub fn positive(&self) -> Option<Channel> {
        num_traits::FromPrimitive::from_u8(self.muxp())
    }

    /// Selected negative input, or None for a reserved mux value.
    pub fn negative(&self) -> Option<Channel> {
        num_traits::FromPrimitive::from_u8(self.muxn())
    }
}

bitfield! {
    /// Gain amplifier configuration.
    #[derive(Clone, Copy)]
    pub struct Pga(u8);
    pub delay, set_delay: 7, 5;
    pub pga_en, set_pga_en: 4, 3;
    pub gain, set_gain: 2, 0;
}
register!(Pga, Pga);

bitfield! {
    /// Data rate and filter configuration.
    #[derive(Clone, Copy)]
    pub struct Datarate(u8);
    pub g_chop, set_g_chop: 7;
    pub clk, set_clk: 6;
    pub mode, set_mode: 5;
    pub filter, set_filter: 4;
    pub dr, set_dr: 3, 0;
}
register!(Datarate, Datarate);

bitfield! {
    /// Reference selection and monitoring.
    #[derive(Clone, Copy)]
    pub struct Ref(u8);
    pub fl_ref_en, set_fl_ref_en: 7, 6;
    pub refp_buf, set_refp_buf: 5;
    pub refn_buf, set_refn_buf: 4;
    pub refsel, set_refsel: 3, 2;
    pub refcon, set_refcon: 1, 0;
}
register!(Ref, Ref);

bitfield! {
    /// Excitation current output routing.
    #[derive(Clone, Copy)]
    pub struct IdacMux(u8);
    pub i2mux, set_i2mux: 7, 4;
    pub i1mux, set_i1mux: 3, 0;
}
register!(IdacMux, IdacMux);

bitfield! {
    /// System monitor and calibration configuration.
    #[derive(Clone, Copy)]
    pub struct Sys(u8);
    pub sys_mon, set_sys_mon: 7, 5;
    pub cal_samp, set_cal_samp: 4, 3;
    pub timeout, set_timeout: 2;
    pub crc, set_crc: 1;
    pub sendstat, set_sendstat: 0;
}
register!(Sys, Sys);

bitfield! {
    /// Full-scale calibration, high byte.
    #[derive(Clone, Copy)]
    pub struct Fscal1(u8);
    pub fscal, set_fscal: 7, 0;
}
register!(Fscal1, Fscal1);
