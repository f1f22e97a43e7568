use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::Error;
use crate::merge::Linker;

const ADDRESS_SPACE: u32 = 0x1_0000;

/// Start addresses for `items` (`name -> (size, fixed address)`).
///
/// Fixed items are checked against each other first; the rest are packed in
/// order from the highest end among the fixed ones.
pub fn allocate(items: &IndexMap<String, (u32, Option<u16>)>) -> Result<IndexMap<String, u16>, Error> {
    let mut allocations = IndexMap::new();
    let mut occupied: Vec<(&str, u32, u32)> = Vec::new();

    // First pass: items with fixed addresses
    for (name, (size, fixed)) in items {
        let Some(addr) = fixed else {
            continue;
        };
        let range = (*addr as u32, *addr as u32 + size);
        if range.1 > ADDRESS_SPACE {
            return Err(Error::AddressOutOfRange(name.clone(), range.0, *size));
        }
        for (other, begin, end) in &occupied {
            if overlaps(range, (*begin, *end)) {
                return Err(Error::OverlappingSections(other.to_string(), name.clone()));
            }
        }
        allocations.insert(name.clone(), *addr);
        occupied.push((name.as_str(), range.0, range.1));
    }

    // Second pass: everything else, one after another
    let mut next = occupied.iter().map(|(_, _, end)| *end).max().unwrap_or(0);
    for (name, (size, fixed)) in items {
        if fixed.is_some() {
            continue;
        }
        if next + size > ADDRESS_SPACE || (next == ADDRESS_SPACE && *size == 0) {
            return Err(Error::AddressOutOfRange(name.clone(), next, *size));
        }
        allocations.insert(name.clone(), next as u16);
        next += size;
    }

    Ok(allocations)
}

/// Half-open ranges; empty ranges never overlap.
fn overlaps(a: (u32, u32), b: (u32, u32)) -> bool {
    a.0 < a.1 && b.0 < b.1 && a.0 < b.1 && b.0 < a.1
}

/// `section: address` map read from a YAML file.
#[derive(Debug, Deserialize)]
struct PlaceList(HashMap<String, u16>);

/// Loads a placement file, ordered by section name.
pub fn load_places(path: &str) -> Result<IndexMap<String, u16>, Error> {
    let file = File::open(path).map_err(|e| Error::FileOpen(path.to_string(), e))?;
    let list: PlaceList =
        serde_yaml::from_reader(BufReader::new(file)).map_err(|e| Error::Config(path.to_string(), e))?;
    let mut places: Vec<(String, u16)> = list.0.into_iter().collect();
    places.sort();
    Ok(places.into_iter().collect())
}

/// Parses `section@address`, the address in decimal or `0x` hex.
pub fn parse_place(arg: &str) -> Result<(String, u16), Error> {
    let invalid = || Error::InvalidPlace(arg.to_string());
    let (name, addr) = arg.split_once('@').ok_or_else(invalid)?;
    if name.is_empty() {
        return Err(invalid());
    }
    let addr = match addr.strip_prefix("0x").or_else(|| addr.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => addr.parse::<u16>(),
    }
    .map_err(|_| invalid())?;
    Ok((name.to_string(), addr))
}

impl Linker {
    /// Assigns every section its start address. Returns the names in
    /// `places` that match no section.
    pub fn place(&mut self, places: &IndexMap<String, u16>) -> Result<Vec<String>, Error> {
        let items = self
            .sections
            .values()
            .map(|s| (s.name.clone(), (s.len(), places.get(&s.name).copied())))
            .collect::<IndexMap<_, _>>();
        let allocations = allocate(&items)?;

        for section in self.sections.values_mut() {
            section.start = allocations.get(&section.name).copied().unwrap_or(0);
            section.placed = places.contains_key(&section.name);
        }
        Ok(places
            .keys()
            .filter(|name| !self.sections.contains_key(*name))
            .cloned()
            .collect())
    }
}
