use crate::Eeprom;
use crate::error::Error;
use crate::platform::Platform;
#[cfg(feature = "defmt")]
use defmt::warn;

impl<T: Platform> Eeprom<T> {
    /// Walks the active page from the newest packet backwards. The first corrupted packet stops the
    /// walk. For every intact packet an older copy of the same variable is tombstoned, which cleans
    /// up after a write that was interrupted before its predecessor was freed.
    pub(crate) fn scrub(&mut self) -> Result<(), Error> {
        let page = self.cursor.page;

        for slot in (0..self.cursor_end()).rev() {
            let packet = self.load_packet(page, slot)?;
            if !packet.is_live() {
                continue;
            }

            if !packet.is_intact() {
                #[cfg(feature = "defmt")]
                warn!("scrub: corrupted packet @ {}[{}]: {}", page, slot, packet);

                return Err(Error::DataCorrupted);
            }

            self.free_var(packet.virtual_address, slot)?;
        }

        Ok(())
    }
}
