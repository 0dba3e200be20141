//! Fixed English vocabulary used to draw match word lists.
//!
//! Common words, 3-10 letters, no punctuation — mirrors
//! `original_source`'s embedded `WORD_LIST` constant.
pub const VOCABULARY: &[&str] = &[
    "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "pack", "my",
    "box", "with", "five", "dozen", "liquor", "jugs", "time", "flies", "like", "arrow",
    "fruit", "banana", "never", "odd", "even", "number", "happy", "sad", "glad", "mad",
    "quiet", "loud", "silent", "noisy", "bright", "dark", "light", "heavy", "soft", "hard",
    "water", "fire", "earth", "wind", "storm", "cloud", "rain", "snow", "sleet", "hail",
    "river", "ocean", "mountain", "valley", "forest", "desert", "island", "coast", "shore", "cliff",
    "house", "garden", "window", "door", "kitchen", "bedroom", "garage", "attic", "cellar", "porch",
    "table", "chair", "couch", "shelf", "mirror", "carpet", "curtain", "pillow", "blanket", "lamp",
    "coffee", "tea", "sugar", "salt", "pepper", "bread", "butter", "cheese", "apple", "orange",
    "grape", "melon", "peach", "cherry", "lemon", "lime", "mango", "papaya", "coconut", "pear",
    "computer", "keyboard", "monitor", "mouse", "printer", "speaker", "camera", "battery", "cable", "switch",
    "engine", "wheel", "brake", "pedal", "bumper", "fender", "exhaust", "piston", "gear", "planet",
    "star", "galaxy", "comet", "meteor", "nebula", "orbit", "rocket", "shuttle", "satellite", "doctor",
    "nurse", "patient", "hospital", "clinic", "surgery", "medicine", "vaccine", "therapy", "bandage", "teacher",
    "student", "school", "college", "library", "lecture", "exam", "lesson", "classroom", "diploma", "market",
    "shop", "store", "vendor", "customer", "price", "discount", "receipt", "coupon", "basket", "music",
    "guitar", "piano", "violin", "drum", "trumpet", "flute", "singer", "chorus", "melody", "soccer",
    "tennis", "hockey", "boxing", "rugby", "cricket", "swimming", "running", "cycling", "archery", "jungle",
    "meadow", "prairie", "swamp", "tundra", "glacier", "volcano", "canyon", "plateau", "stream", "brook",
    "lake", "pond", "delta", "estuary", "harbor", "bay", "lagoon", "silver", "golden", "bronze",
    "copper", "iron", "steel", "platinum", "diamond", "crystal", "marble", "winter", "summer", "spring",
    "autumn", "season", "weather", "climate", "forecast", "sunrise", "sunset", "travel", "voyage", "journey",
    "flight", "ticket", "luggage", "airport", "station", "platform", "terminal", "friend", "family", "cousin",
    "sister", "brother", "parent", "grandpa", "grandma", "nephew", "niece", "castle", "palace", "tower",
    "bridge", "temple", "church", "mosque", "shrine", "fortress", "village", "pencil", "eraser", "marker",
    "crayon", "folder", "binder", "staple", "scissor", "ruler", "compass", "rabbit", "turtle", "beaver",
    "otter", "badger", "weasel", "hedgehog", "squirrel", "raccoon", "possum", "eagle", "falcon", "sparrow",
    "robin", "heron", "pelican", "flamingo", "penguin", "ostrich", "peacock", "shark", "dolphin", "whale",
    "salmon", "trout", "catfish", "jellyfish", "octopus", "starfish", "seahorse", "wizard", "knight", "dragon",
    "goblin", "archer", "ranger", "paladin", "rogue", "mage", "kingdom", "empire", "colony", "border",
    "frontier", "province", "region", "territory", "domain", "whisper", "shout", "murmur", "scream", "giggle",
    "laugh", "chuckle", "sigh", "gasp", "yawn", "velvet", "cotton", "linen", "silk", "wool",
    "denim", "leather", "suede", "canvas", "fleece", "brave", "gentle", "fierce", "calm", "bold",
    "timid", "clever", "witty", "humble", "proud", "maple", "willow", "birch", "cedar", "spruce",
    "walnut", "poplar", "sycamore", "cypress", "pilot", "cockpit", "runway", "hangar", "cargo", "freight",
    "anchor", "rudder", "violet", "indigo", "maroon", "scarlet", "amber", "ivory", "ebony", "charcoal",
    "lavender", "turquoise", "honest", "truthful", "loyal", "faithful", "reliable", "trusted", "sincere", "genuine",
    "candid", "frank", "puzzle", "riddle", "mystery", "secret", "clue", "hint", "answer", "question",
    "problem", "solution",
];
