#![no_main]

use libfuzzer_sys::fuzz_target;
use nbcheck_format::parse_notebook;

fuzz_target!(|data: &[u8]| {
    // Notebooks are UTF-8 JSON; anything else is rejected before parsing
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(nb) = parse_notebook("fuzz.ipynb", s) {
            // Every reported code cell index must point back into the cell list
            for (index, cell) in nb.code_cells() {
                assert_eq!(&nb.cells[index], cell);
            }
        }
    }
});
