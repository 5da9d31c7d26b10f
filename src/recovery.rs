use crate::Eeprom;
use crate::error::Error;
use crate::page::PageId::{self, Page0, Page1};
use crate::page::PageStatus;
use crate::platform::Platform;
use crate::store::Cursor;
use strum::EnumCount;
#[cfg(feature = "defmt")]
use defmt::{debug, warn};

/// What `init()` does for a combination of page status words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum RecoveryAction {
    /// Keep writing into the page, forcing it `Active` first.
    Resume(PageId),
    /// The source of a transfer is already erased, only the final status write is missing.
    FinishTransfer(PageId),
    /// The source of a transfer is intact, redo the whole copy.
    RestartTransfer {
        source: PageId,
        destination: PageId,
    },
    /// No consistent state can be derived, erase both pages.
    Reformat,
}

use RecoveryAction::{FinishTransfer, Reformat, RestartTransfer, Resume};

const RESTART_INTO_PAGE0: RecoveryAction = RestartTransfer {
    source: Page1,
    destination: Page0,
};
const RESTART_INTO_PAGE1: RecoveryAction = RestartTransfer {
    source: Page0,
    destination: Page1,
};

/// Indexed by `[page1 status][page0 status]` in `PageStatus` discriminant order:
/// Erased, Receiving, Active, Undefined.
const RECOVERY_TABLE: [[RecoveryAction; PageStatus::COUNT]; PageStatus::COUNT] = [
    // page1 Erased
    [Resume(Page0), Resume(Page0), Resume(Page0), Resume(Page0)],
    // page1 Receiving
    [FinishTransfer(Page1), Reformat, RESTART_INTO_PAGE1, Reformat],
    // page1 Active
    [Resume(Page1), RESTART_INTO_PAGE0, Reformat, Reformat],
    // page1 Undefined
    [Reformat, Reformat, Reformat, Reformat],
];

pub(crate) const fn recovery_action(page0: PageStatus, page1: PageStatus) -> RecoveryAction {
    RECOVERY_TABLE[page1 as usize][page0 as usize]
}

impl<T: Platform> Eeprom<T> {
    /// Brings the pages into a state with exactly one active page and a located cursor.
    pub(crate) fn recover(&mut self) -> Result<(), Error> {
        let page0 = self.read_page_status(Page0)?;
        let page1 = self.read_page_status(Page1)?;
        let action = recovery_action(page0, page1);

        #[cfg(feature = "defmt")]
        debug!("recover: page0 {}, page1 {} -> {}", page0, page1, action);

        match action {
            Resume(page) => self.resume(page),
            FinishTransfer(page) => self.finish_transfer(page),
            RestartTransfer {
                source,
                destination,
            } => self.restart_transfer(source, destination),
            Reformat => {
                #[cfg(feature = "defmt")]
                warn!("recover: inconsistent pages ({}, {}), formatting", page0, page1);

                self.reformat()
            }
        }
    }

    fn resume(&mut self, page: PageId) -> Result<(), Error> {
        self.set_page_status(page, PageStatus::Active)?;
        if self.locate_cursor(page)? {
            return Ok(());
        }

        self.transfer(page, page.other())?;
        if self.cursor.next_slot.is_none() {
            return Err(Error::Unrecoverable);
        }
        Ok(())
    }

    fn finish_transfer(&mut self, page: PageId) -> Result<(), Error> {
        self.set_page_status(page, PageStatus::Active)?;
        if !self.locate_cursor(page)? {
            return Err(Error::Unrecoverable);
        }
        Ok(())
    }

    /// Erases both pages and starts over with an empty active page 0.
    pub(crate) fn reformat(&mut self) -> Result<(), Error> {
        self.erase_page(Page0)?;
        self.erase_page(Page1)?;
        self.set_page_status(Page0, PageStatus::Active)?;
        self.cursor = Cursor {
            page: Page0,
            next_slot: Some(0),
        };
        Ok(())
    }
}
