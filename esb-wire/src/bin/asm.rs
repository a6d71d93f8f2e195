#![no_std]
#![no_main]

use core::ptr::{addr_of, addr_of_mut, read_volatile, write_volatile};

use panic_halt as _;

use cortex_m_rt::entry;
use esb_wire::{decode, encode, Frame, Message, FRAME_SIZE};

static mut RX: [u8; FRAME_SIZE] = [0; FRAME_SIZE];
static mut TX: [u8; FRAME_SIZE] = [0; FRAME_SIZE];

#[inline(never)]
fn unpack(raw: &[u8]) -> Option<Message> {
    decode(raw).ok()
}

#[inline(never)]
fn pack(message: &Message) -> Frame {
    encode(message)
}

#[entry]
fn main() -> ! {
    loop {
        let raw = unsafe { read_volatile(addr_of!(RX)) };

        if let Some(message) = unpack(&raw[..usize::from(raw[0]) % FRAME_SIZE]) {
            let frame = pack(&message);

            let mut tx = [0; FRAME_SIZE];
            tx[..frame.len()].copy_from_slice(frame.as_bytes());

            unsafe { write_volatile(addr_of_mut!(TX), tx) };
        }
    }
}
