#![no_main]
use std::any::TypeId;
use std::cell::Cell;

use libfuzzer_sys::fuzz_target;

#[derive(Debug)]
struct FuzzType;

thread_local! {
    static REGISTERED: Cell<bool> = Cell::new(false);
}

fuzz_target!(|data: &[u8]| {
    REGISTERED.with(|r| {
        if !r.get() {
            let _ = shardwire::register(TypeId::of::<FuzzType>(), "Fuzz", None, None);
            r.set(true);
        }
    });
    let _ = shardwire::deserialize(data);
});
