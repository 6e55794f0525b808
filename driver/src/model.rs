//! Model numbers as reported by `ping`, and the control table each one uses.

use dynamixel2_packet::{Family, X_SERIES};

#[derive(Debug, Eq, PartialEq)]
pub struct Model {
    pub number: u16,
    pub name: &'static str,
    /// `None` for models whose memory map isn't described here.
    pub family: Option<&'static Family>,
}

impl Model {
    const fn new(number: u16, name: &'static str, family: Option<&'static Family>) -> Self {
        Self {
            number,
            name,
            family,
        }
    }
}

pub static MODELS: &[Model] = &[
    Model::new(12, "AX-12A", None),
    Model::new(300, "AX-12W", None),
    Model::new(18, "AX-18A", None),
    Model::new(10, "RX-10", None),
    Model::new(24, "RX-24F", None),
    Model::new(28, "RX-28", None),
    Model::new(64, "RX-64", None),
    Model::new(107, "EX-106", None),
    Model::new(104, "MX-12W", None),
    Model::new(29, "MX-28", None),
    Model::new(30, "MX-28-2", None),
    Model::new(310, "MX-64", None),
    Model::new(311, "MX-64-2", None),
    Model::new(320, "MX-106", None),
    Model::new(321, "MX-106-2", None),
    Model::new(350, "XL-320", None),
    Model::new(1060, "XL430-W250", Some(&X_SERIES)),
    Model::new(1030, "XM430-W210", Some(&X_SERIES)),
    Model::new(1020, "XM430-W350", Some(&X_SERIES)),
    Model::new(1130, "XM540-W150", Some(&X_SERIES)),
    Model::new(1120, "XM540-W270", Some(&X_SERIES)),
    Model::new(1050, "XH430-V210", Some(&X_SERIES)),
    Model::new(1040, "XH430-V350", Some(&X_SERIES)),
    Model::new(1010, "XH430-W210", Some(&X_SERIES)),
    Model::new(1000, "XH430-W350", Some(&X_SERIES)),
    Model::new(35072, "PRO-L42-10-S300-R", None),
    Model::new(37928, "PRO-L54-30-S400-R", None),
    Model::new(37896, "PRO-L54-30-S500-R", None),
    Model::new(38176, "PRO-L54-50-S290-R", None),
    Model::new(38152, "PRO-L54-50-S500-R", None),
    Model::new(43288, "PRO-M42-10-S260-R", None),
    Model::new(46096, "PRO-M54-40-S250-R", None),
    Model::new(46352, "PRO-M54-60-S250-R", None),
    Model::new(51200, "PRO-H42-20-S300-R", None),
    Model::new(53768, "PRO-H54-100-S500-R", None),
    Model::new(54024, "PRO-H54-200-S500-R", None),
    Model::new(2000, "PRO-H42P-020-S300-R", None),
    Model::new(2010, "PRO-H54P-100-S500-R", None),
    Model::new(2020, "PRO-H54P-200-S500-R", None),
];

#[inline]
pub fn lookup(number: u16) -> Option<&'static Model> {
    MODELS.iter().find(|model| model.number == number)
}
