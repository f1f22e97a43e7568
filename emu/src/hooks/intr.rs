use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

use serde::{Deserialize, Serialize};

use super::Hook;
use crate::error::Error;
use crate::exec::Step;
use crate::model::Cpu;

/// Scripted interrupt requests.
#[derive(Debug)]
pub struct Intr {
    file: Option<String>,
    list: List,
}

/// Step number -> interrupt line.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct List(HashMap<u64, u8>);

impl Intr {
    pub fn arg(file: Option<String>) -> Result<Self, Error> {
        let list = match &file {
            Some(fname) => {
                let f = File::open(fname).map_err(|e| Error::FileOpen(fname.clone(), e))?;
                serde_yaml::from_reader(BufReader::new(f)).map_err(|e| Error::Config(fname.clone(), e))?
            }
            None => List::default(),
        };
        Ok(Self { file, list })
    }

    pub fn from_list(list: impl IntoIterator<Item = (u64, u8)>) -> Self {
        Self {
            file: None,
            list: List(list.into_iter().collect()),
        }
    }
}

impl Hook for Intr {
    fn init(&mut self, cpu: Cpu) -> Result<Cpu, Error> {
        if let Some(fname) = &self.file {
            println!(" * Intr[{}] {:?}", self.list.0.len(), fname);
        }
        Ok(cpu)
    }

    fn exec(&mut self, time: u64, _step: &Step, mut cpu: Cpu) -> Result<Cpu, Error> {
        if let Some(line) = self.list.0.get(&time) {
            cpu.request(*line);
        }
        Ok(cpu)
    }
}
