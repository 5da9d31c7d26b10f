mod common;

use flash_eeprom::error::Error;
use flash_eeprom::{Eeprom, Packet, PageId};
use pretty_assertions::assert_eq;

fn formatted_with(packets: &[Packet]) -> common::Flash {
    let mut flash = common::Flash::new(2);
    flash.set_status_word(PageId::Page0, 0);
    for (slot, packet) in packets.iter().enumerate() {
        flash.set_slot(PageId::Page0, slot, packet.to_bytes());
    }
    flash
}

#[test]
fn flipped_data_bit() {
    let mut flash = common::Flash::new(2);

    {
        let mut eeprom = Eeprom::new(common::config(), &mut flash).unwrap();
        eeprom.init().unwrap();
        eeprom.write_var(5, 100).unwrap();
    }

    flash.flip_bits(common::Flash::slot_offset(PageId::Page0, 0), 0x01);

    // init reports nothing, corruption is left for the caller to find
    let mut eeprom = Eeprom::new(common::config(), &mut flash).unwrap();
    eeprom.init().unwrap();

    assert_eq!(eeprom.read_var(5), Err(Error::DataCorrupted));
    assert_eq!(eeprom.check_data_integrity(), Err(Error::DataCorrupted));
    assert_eq!(eeprom.read_all_var(&mut [Packet::EMPTY; 4]), Ok(0));

    // a new value supersedes the corrupted one
    eeprom.write_var(5, 101).unwrap();
    assert_eq!(eeprom.read_var(5).unwrap(), 101);
    assert_eq!(eeprom.check_data_integrity(), Ok(()));
}

#[test]
fn flipped_checksum_bit() {
    let mut flash = formatted_with(&[Packet::new(5, 100)]);
    flash.flip_bits(common::Flash::slot_offset(PageId::Page0, 0) + 4, 0x80);

    let mut eeprom = Eeprom::new(common::config(), &mut flash).unwrap();
    eeprom.init().unwrap();

    assert_eq!(eeprom.read_var(5), Err(Error::DataCorrupted));
}

#[test]
fn corrupted_older_variable_does_not_affect_others() {
    let mut flash = formatted_with(&[Packet::new(6, 1), Packet::new(5, 100)]);
    flash.flip_bits(common::Flash::slot_offset(PageId::Page0, 0) + 2, 0x10);

    let mut eeprom = Eeprom::new(common::config(), &mut flash).unwrap();
    eeprom.init().unwrap();

    assert_eq!(eeprom.read_var(5).unwrap(), 100);
    assert_eq!(eeprom.read_var(6), Err(Error::DataCorrupted));

    let mut buffer = [Packet::EMPTY; 4];
    assert_eq!(eeprom.read_all_var(&mut buffer), Ok(1));
    assert_eq!(buffer[0], Packet::new(5, 100));
}

#[test]
fn newest_packet_decides() {
    // an older intact copy is not used as a fallback
    let mut flash = formatted_with(&[Packet::new(5, 100), Packet::new(5, 200)]);
    flash.flip_bits(common::Flash::slot_offset(PageId::Page0, 1), 0x01);

    let mut eeprom = Eeprom::new(common::config(), &mut flash).unwrap();
    eeprom.init().unwrap();

    assert_eq!(eeprom.read_var(5), Err(Error::DataCorrupted));
}

#[test]
fn init_drops_duplicates() {
    // a write interrupted before the previous packet was freed
    let mut flash = formatted_with(&[
        Packet::new(5, 100),
        Packet::new(6, 1),
        Packet::new(5, 200),
    ]);

    {
        let mut eeprom = Eeprom::new(common::config(), &mut flash).unwrap();
        eeprom.init().unwrap();

        assert_eq!(eeprom.read_var(5).unwrap(), 200);
        assert_eq!(eeprom.read_var(6).unwrap(), 1);

        let statistics = eeprom.statistics().unwrap();
        let page0 = &statistics.pages[PageId::Page0 as usize];
        assert_eq!(page0.entries.written, 2);
        assert_eq!(page0.entries.freed, 1);
    }

    assert_eq!(flash.slot(PageId::Page0, 0), Packet::FREED.to_bytes());
}

#[test]
fn integrity_check_stops_at_first_corruption() {
    let mut corrupted = Packet::new(9, 9);
    corrupted.crc ^= 0x0100;

    let mut flash = formatted_with(&[
        Packet::new(7, 1),
        Packet::new(7, 2),
        corrupted,
        Packet::new(8, 5),
    ]);

    {
        let mut eeprom = Eeprom::new(common::config(), &mut flash).unwrap();
        eeprom.init().unwrap();

        assert_eq!(eeprom.check_data_integrity(), Err(Error::DataCorrupted));
        assert_eq!(eeprom.read_var(7).unwrap(), 2);
        assert_eq!(eeprom.read_var(8).unwrap(), 5);
        assert_eq!(eeprom.read_var(9), Err(Error::DataCorrupted));

        let mut buffer = [Packet::EMPTY; 4];
        let count = eeprom.read_all_var(&mut buffer).unwrap();
        assert_eq!(&buffer[..count], &[Packet::new(8, 5), Packet::new(7, 2)]);
    }

    // the duplicate below the corrupted packet is still there
    assert_eq!(flash.slot(PageId::Page0, 0), Packet::new(7, 1).to_bytes());
}

#[test]
fn torn_packet() {
    // power loss after the data word of the second packet
    let mut flash = formatted_with(&[Packet::new(3, 30)]);
    let mut torn = [0xFF; 8];
    torn[..4].copy_from_slice(&Packet::new(3, 31).to_bytes()[..4]);
    flash.set_slot(PageId::Page0, 1, torn);

    let mut eeprom = Eeprom::new(common::config(), &mut flash).unwrap();
    eeprom.init().unwrap();

    assert_eq!(eeprom.read_var(3).unwrap(), 30);

    // the torn slot is skipped
    eeprom.write_var(3, 32).unwrap();
    assert_eq!(eeprom.read_var(3).unwrap(), 32);
    drop(eeprom);

    assert_eq!(flash.slot(PageId::Page0, 0), Packet::FREED.to_bytes());
    assert_eq!(flash.slot(PageId::Page0, 1), torn);
    assert_eq!(flash.slot(PageId::Page0, 2), Packet::new(3, 32).to_bytes());
}
