/// Class names of the `garythung/trashnet` dataset, in label-index order.
pub const TRASHNET_CLASSES: [&str; 6] = ["cardboard", "glass", "metal", "paper", "plastic", "trash"];

/// Resolve a human-readable name for a label index, falling back to `class_<idx>`.
pub fn class_name(names: &[String], idx: usize) -> String {
    names
        .get(idx)
        .cloned()
        .unwrap_or_else(|| format!("class_{idx}"))
}

/// Default class names for `num_classes` labels: TrashNet names where they fit.
pub fn default_class_names(num_classes: usize) -> Vec<String> {
    (0..num_classes)
        .map(|i| {
            TRASHNET_CLASSES
                .get(i)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("class_{i}"))
        })
        .collect()
}

/// Disposal stream a classified item belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisposalBin {
    Recyclable,
    Organic,
    Hazardous,
    Residual,
}

impl DisposalBin {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisposalBin::Recyclable => "Recyclable",
            DisposalBin::Organic => "Organic",
            DisposalBin::Hazardous => "Hazardous",
            DisposalBin::Residual => "Residual",
        }
    }
}

impl std::fmt::Display for DisposalBin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which bin a class goes in, with a short handling hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinGuidance {
    pub bin: DisposalBin,
    pub advice: &'static str,
}

const fn guidance(bin: DisposalBin, advice: &'static str) -> BinGuidance {
    BinGuidance { bin, advice }
}

/// Map a class label to disposal guidance.
///
/// TrashNet names match exactly (case-insensitive). Other labels are matched on
/// keywords; anything unrecognized goes to the residual bin.
pub fn bin_guidance(label: &str) -> BinGuidance {
    let label = label.trim().to_ascii_lowercase();
    match label.as_str() {
        "cardboard" => guidance(DisposalBin::Recyclable, "Flatten and keep dry before recycling"),
        "glass" => guidance(DisposalBin::Recyclable, "Rinse and remove lids before recycling"),
        "metal" => guidance(DisposalBin::Recyclable, "Rinse cans and recycle"),
        "paper" => guidance(DisposalBin::Recyclable, "Recycle clean, dry paper"),
        "plastic" => guidance(DisposalBin::Recyclable, "Rinse and recycle"),
        "trash" => guidance(DisposalBin::Residual, "General waste bin"),
        other if other.contains("organic") || other.contains("food") || other.contains("compost") => {
            guidance(DisposalBin::Organic, "Compost or food waste bin")
        }
        other if other.contains("hazard") || other.contains("battery") => {
            guidance(DisposalBin::Hazardous, "Take to a hazardous waste drop-off")
        }
        other if other.contains("recycl") => guidance(DisposalBin::Recyclable, "Rinse and recycle"),
        _ => guidance(DisposalBin::Residual, "Check local sorting rules"),
    }
}

/// Running count of classified items per disposal bin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinTally {
    pub total: usize,
    pub recyclable: usize,
    pub organic: usize,
    pub hazardous: usize,
    pub residual: usize,
}

impl BinTally {
    pub fn add(&mut self, bin: DisposalBin) {
        self.total += 1;
        match bin {
            DisposalBin::Recyclable => self.recyclable += 1,
            DisposalBin::Organic => self.organic += 1,
            DisposalBin::Hazardous => self.hazardous += 1,
            DisposalBin::Residual => self.residual += 1,
        }
    }

    /// Share of recyclable items, rounded to a whole percent; 0 when empty.
    pub fn recyclable_percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.recyclable as f64 / self.total as f64) * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_for_unknown_index() {
        let names = vec!["glass".to_string()];
        assert_eq!(class_name(&names, 0), "glass");
        assert_eq!(class_name(&names, 3), "class_3");
    }

    #[test]
    fn default_names_extend_past_trashnet() {
        let names = default_class_names(8);
        assert_eq!(names[0], "cardboard");
        assert_eq!(names[5], "trash");
        assert_eq!(names[7], "class_7");
    }

    #[test]
    fn trashnet_classes_map_to_bins() {
        for name in ["cardboard", "glass", "metal", "paper", "plastic"] {
            assert_eq!(bin_guidance(name).bin, DisposalBin::Recyclable, "{name}");
        }
        assert_eq!(bin_guidance("trash").bin, DisposalBin::Residual);
        assert_eq!(bin_guidance(" Glass ").bin, DisposalBin::Recyclable);
        assert!(!bin_guidance("plastic").advice.is_empty());
    }

    #[test]
    fn unknown_labels_fall_back_by_keyword() {
        assert_eq!(bin_guidance("food_scraps").bin, DisposalBin::Organic);
        assert_eq!(bin_guidance("battery").bin, DisposalBin::Hazardous);
        assert_eq!(bin_guidance("class_7").bin, DisposalBin::Residual);
        assert_eq!(bin_guidance("class_7").advice, "Check local sorting rules");
    }

    #[test]
    fn tally_reports_recyclable_share() {
        let mut tally = BinTally::default();
        assert_eq!(tally.recyclable_percent(), 0);
        for label in ["glass", "paper", "trash"] {
            tally.add(bin_guidance(label).bin);
        }
        assert_eq!(tally.total, 3);
        assert_eq!(tally.recyclable, 2);
        assert_eq!(tally.residual, 1);
        assert_eq!(tally.recyclable_percent(), 67);
    }
}
