use std::collections::{BTreeMap, HashMap};

use super::styles::NumberingRef;
use super::{WML_NS, wml, wml_attr};

/// Word accepts start values up to this; larger ones are clamped.
const MAX_START: u32 = 32767;

fn start_val(v: &str) -> Option<u32> {
    v.parse::<u32>().ok().map(|n| n.min(MAX_START))
}

#[derive(Clone, Debug)]
pub(crate) struct LevelDef {
    pub(crate) num_fmt: String,
    pub(crate) lvl_text: String,
    pub(crate) start: u32,
}

#[derive(Debug, Default)]
struct NumDef {
    abstract_id: String,
    start_overrides: HashMap<u8, u32>,
}

/// Numbering definitions from `word/numbering.xml`.
#[derive(Debug, Default)]
pub struct Numbering {
    abstract_nums: HashMap<String, BTreeMap<u8, LevelDef>>,
    nums: HashMap<String, NumDef>,
}

impl Numbering {
    pub fn parse(xml_content: &str) -> Self {
        let mut numbering = Numbering::default();
        let Ok(xml) = roxmltree::Document::parse(xml_content) else {
            log::warn!("Unreadable numbering part, list markers fall back to bullets");
            return numbering;
        };

        for node in xml.root_element().children() {
            if node.tag_name().namespace() != Some(WML_NS) {
                continue;
            }
            match node.tag_name().name() {
                "abstractNum" => {
                    let Some(abs_id) = node.attribute((WML_NS, "abstractNumId")) else {
                        continue;
                    };
                    let mut levels: BTreeMap<u8, LevelDef> = BTreeMap::new();
                    for lvl in node.children() {
                        if lvl.tag_name().name() != "lvl"
                            || lvl.tag_name().namespace() != Some(WML_NS)
                        {
                            continue;
                        }
                        let Some(ilvl) = lvl
                            .attribute((WML_NS, "ilvl"))
                            .and_then(|v| v.parse::<u8>().ok())
                        else {
                            continue;
                        };
                        levels.insert(ilvl, parse_level(lvl));
                    }
                    numbering.abstract_nums.insert(abs_id.to_string(), levels);
                }
                "num" => {
                    let Some(num_id) = node.attribute((WML_NS, "numId")) else {
                        continue;
                    };
                    let Some(abs_id) = wml_attr(node, "abstractNumId") else {
                        continue;
                    };
                    let mut start_overrides = HashMap::new();
                    for ovr in node.children().filter(|n| {
                        n.tag_name().name() == "lvlOverride"
                            && n.tag_name().namespace() == Some(WML_NS)
                    }) {
                        let Some(ilvl) = ovr
                            .attribute((WML_NS, "ilvl"))
                            .and_then(|v| v.parse::<u8>().ok())
                        else {
                            continue;
                        };
                        if let Some(start) =
                            wml_attr(ovr, "startOverride").and_then(start_val)
                        {
                            start_overrides.insert(ilvl, start);
                        }
                    }
                    numbering.nums.insert(
                        num_id.to_string(),
                        NumDef {
                            abstract_id: abs_id.to_string(),
                            start_overrides,
                        },
                    );
                }
                _ => {}
            }
        }

        numbering
    }

    fn levels(&self, num_id: &str) -> Option<&BTreeMap<u8, LevelDef>> {
        let num = self.nums.get(num_id)?;
        self.abstract_nums.get(&num.abstract_id)
    }

    fn start(&self, num_id: &str, ilvl: u8) -> u32 {
        self.nums
            .get(num_id)
            .and_then(|n| n.start_overrides.get(&ilvl).copied())
            .or_else(|| {
                self.levels(num_id)
                    .and_then(|l| l.get(&ilvl))
                    .map(|d| d.start)
            })
            .unwrap_or(1)
    }
}

fn parse_level(lvl: roxmltree::Node) -> LevelDef {
    LevelDef {
        num_fmt: wml_attr(lvl, "numFmt").unwrap_or("bullet").to_string(),
        lvl_text: wml_attr(lvl, "lvlText").unwrap_or("").to_string(),
        start: wml(lvl, "start")
            .and_then(|n| n.attribute((WML_NS, "val")))
            .and_then(start_val)
            .unwrap_or(1),
    }
}

pub(crate) struct ListMarker {
    pub(crate) enumerated: bool,
    pub(crate) marker: String,
}

/// Running list counters. Must be fed list paragraphs in document order.
#[derive(Default)]
pub(crate) struct ListCounters {
    counters: HashMap<(String, u8), u32>,
    last_seen_level: HashMap<String, u8>,
}

impl ListCounters {
    pub(crate) fn next_marker(&mut self, numbering: &Numbering, r: &NumberingRef) -> ListMarker {
        let num_id = r.num_id.as_str();
        let ilvl = r.level;

        let Some(levels) = numbering.levels(num_id) else {
            return ListMarker {
                enumerated: false,
                marker: "\u{2022}".to_string(),
            };
        };
        let Some(def) = levels.get(&ilvl) else {
            return ListMarker {
                enumerated: false,
                marker: "\u{2022}".to_string(),
            };
        };

        // Reset deeper-level counters when returning to a higher level
        if let Some(prev) = self.last_seen_level.get(num_id).copied()
            && ilvl <= prev
        {
            for deeper in (ilvl + 1)..=prev {
                self.counters.remove(&(num_id.to_string(), deeper));
            }
        }
        self.last_seen_level.insert(num_id.to_string(), ilvl);

        let start = numbering.start(num_id, ilvl);
        let current_counter = *self
            .counters
            .entry((num_id.to_string(), ilvl))
            .and_modify(|c| *c = c.saturating_add(1))
            .or_insert(start);

        if def.num_fmt == "bullet" {
            let text = normalize_bullet_text(&def.lvl_text);
            return ListMarker {
                enumerated: false,
                marker: if text.is_empty() {
                    "\u{2022}".to_string()
                } else {
                    text
                },
            };
        }

        let mut label = def.lvl_text.clone();
        for lvl_idx in 0..9u8 {
            let placeholder = format!("%{}", lvl_idx + 1);
            if !label.contains(&placeholder) {
                continue;
            }
            let lvl_counter = if lvl_idx == ilvl {
                current_counter
            } else {
                self.counters
                    .get(&(num_id.to_string(), lvl_idx))
                    .copied()
                    .unwrap_or_else(|| numbering.start(num_id, lvl_idx))
            };
            let lvl_fmt = levels
                .get(&lvl_idx)
                .map(|d| d.num_fmt.as_str())
                .unwrap_or("decimal");
            label = label.replace(&placeholder, &format_number(lvl_counter, lvl_fmt));
        }
        if label.is_empty() {
            label = format!("{}.", current_counter);
        }
        ListMarker {
            enumerated: def.num_fmt != "none",
            marker: label,
        }
    }
}

fn to_roman(mut n: u32) -> String {
    const TABLE: &[(u32, &str)] = &[
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut result = String::new();
    for &(value, numeral) in TABLE {
        while n >= value {
            result.push_str(numeral);
            n -= value;
        }
    }
    result
}

fn to_letters(value: u32, base: u8) -> String {
    if value == 0 {
        return String::new();
    }
    let mut n = value - 1;
    let mut result = String::new();
    loop {
        result.insert(0, (base + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

fn format_number(value: u32, num_fmt: &str) -> String {
    match num_fmt {
        "decimal" => value.to_string(),
        "decimalZero" => format!("{value:02}"),
        "lowerLetter" => to_letters(value, b'a'),
        "upperLetter" => to_letters(value, b'A'),
        "lowerRoman" => to_roman(value),
        "upperRoman" => to_roman(value).to_uppercase(),
        "none" => String::new(),
        _ => value.to_string(),
    }
}

fn normalize_bullet_text(text: &str) -> String {
    text.chars()
        .map(|c| {
            let cp = c as u32;
            if (0xF000..=0xF0FF).contains(&cp) {
                symbol_pua_to_unicode(cp).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

fn symbol_pua_to_unicode(cp: u32) -> Option<char> {
    let sym = cp - 0xF000;
    let mapped = match sym {
        0xB7 => '\u{2022}', // bullet •
        0xA7 => '\u{25A0}', // black square ■ (Wingdings §)
        0xA8 => '\u{25CB}', // white circle ○
        0xD8 => '\u{2666}', // diamond ◆
        0x76 => '\u{221A}', // check mark √
        _ => return char::from_u32(sym),
    };
    Some(mapped)
}
