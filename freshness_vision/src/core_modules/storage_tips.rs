// Static storage advice, one record per food category. Nothing here is derived
// from the image; lookups that miss fall back to the fruit record.

use crate::core_modules::food_category::FoodCategory;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageTip {
    pub temperature_range: &'static str,
    pub humidity_range: &'static str,
    pub shelf_life_range: &'static str,
    /// Ordered, most important first.
    pub tips: &'static [&'static str],
}

const FRUIT: StorageTip = StorageTip {
    temperature_range: "35-45°F (2-7°C)",
    humidity_range: "85-95%",
    shelf_life_range: "3-7 days",
    tips: &[
        "Store in refrigerator crisper",
        "Keep away from ethylene-producing fruits",
        "Wash before eating, not before storing",
    ],
};

const VEGETABLE: StorageTip = StorageTip {
    temperature_range: "32-40°F (0-4°C)",
    humidity_range: "90-95%",
    shelf_life_range: "5-10 days",
    tips: &[
        "Store in refrigerator crisper",
        "Keep in perforated plastic bags",
        "Remove any damaged pieces",
    ],
};

const MEAT: StorageTip = StorageTip {
    temperature_range: "32-40°F (0-4°C)",
    humidity_range: "80-85%",
    shelf_life_range: "1-3 days",
    tips: &[
        "Store in coldest part of fridge",
        "Keep in original packaging",
        "Use within 2 days or freeze",
    ],
};

const DAIRY: StorageTip = StorageTip {
    temperature_range: "35-40°F (2-4°C)",
    humidity_range: "80-85%",
    shelf_life_range: "5-14 days",
    tips: &[
        "Keep refrigerated at all times",
        "Store in original container",
        "Check expiration dates",
    ],
};

const COOKED_FOOD: StorageTip = StorageTip {
    temperature_range: "35-40°F (2-4°C)",
    humidity_range: "70-80%",
    shelf_life_range: "2-4 days",
    tips: &[
        "Refrigerate within 2 hours of cooking",
        "Store in airtight containers",
        "Reheat thoroughly before consuming",
        "Discard if sour smell or mold appears",
    ],
};

const BREAD: StorageTip = StorageTip {
    temperature_range: "68-72°F (20-22°C)",
    humidity_range: "60-70%",
    shelf_life_range: "3-7 days",
    tips: &[
        "Store in cool, dry place",
        "Keep in bread box or sealed bag",
        "Freeze for longer storage",
        "Check for mold before eating",
    ],
};

const SEAFOOD: StorageTip = StorageTip {
    temperature_range: "32-38°F (0-3°C)",
    humidity_range: "95-100%",
    shelf_life_range: "1-2 days",
    tips: &[
        "Store on ice in refrigerator",
        "Use immediately or freeze",
        "Check for fishy odor",
        "Keep separate from other foods",
    ],
};

const EGGS: StorageTip = StorageTip {
    temperature_range: "35-40°F (2-4°C)",
    humidity_range: "70-80%",
    shelf_life_range: "3-5 weeks",
    tips: &[
        "Store in refrigerator",
        "Keep in original carton",
        "Check expiration date",
        "Discard if cracked or smells bad",
    ],
};

impl FoodCategory {
    pub fn storage_tips(self) -> &'static StorageTip {
        match self {
            FoodCategory::Fruit | FoodCategory::Unknown => &FRUIT,
            FoodCategory::Vegetable => &VEGETABLE,
            FoodCategory::Meat => &MEAT,
            FoodCategory::Dairy => &DAIRY,
            FoodCategory::CookedFood => &COOKED_FOOD,
            FoodCategory::Bread => &BREAD,
            FoodCategory::Seafood => &SEAFOOD,
            FoodCategory::Eggs => &EGGS,
        }
    }
}

/// Storage advice for a category key such as `"cooked_food"`.
pub fn storage_tips(key: &str) -> &'static StorageTip {
    FoodCategory::from_key(key)
        .unwrap_or(FoodCategory::Fruit)
        .storage_tips()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_category_has_advice() {
        for category in FoodCategory::KNOWN {
            let tip = category.storage_tips();
            assert!(!tip.tips.is_empty(), "{category} has no tips");
            assert!(!tip.temperature_range.is_empty());
        }
    }

    #[test]
    fn unknown_keys_fall_back_to_fruit() {
        assert_eq!(storage_tips("unknown"), &FRUIT);
        assert_eq!(storage_tips("casserole"), &FRUIT);
        assert_eq!(storage_tips(""), &FRUIT);
    }

    #[test]
    fn lookup_by_key() {
        assert_eq!(storage_tips("eggs").shelf_life_range, "3-5 weeks");
        assert_eq!(storage_tips("cooked_food").tips[0], "Refrigerate within 2 hours of cooking");
        assert_eq!(FoodCategory::Bread.storage_tips().temperature_range, "68-72°F (20-22°C)");
    }
}
