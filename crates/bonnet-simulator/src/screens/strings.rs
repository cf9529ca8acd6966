//! Demo strings, English first and Spanish second.

use bonnet_core::ui::LocalizedStr;

pub fn choose_wisely() -> LocalizedStr {
    LocalizedStr::new(["Choose wisely", "Elige bien"])
}

pub fn red_pill() -> LocalizedStr {
    LocalizedStr::new(["Red pill", "Roja"])
}

pub fn blue_pill() -> LocalizedStr {
    LocalizedStr::new(["Blue pill", "Azul"])
}

pub fn took_red_pill() -> LocalizedStr {
    LocalizedStr::new(["You took\nthe red pill", "Tomaste\nla roja"])
}

pub fn took_blue_pill() -> LocalizedStr {
    LocalizedStr::new(["You took\nthe blue pill", "Tomaste\nla azul"])
}

pub fn real_world() -> LocalizedStr {
    LocalizedStr::new(["WELCOME TO THE REAL WORLD", "BIENVENIDO AL MUNDO REAL"])
}

pub fn no_going_back() -> LocalizedStr {
    LocalizedStr::new(["THERE IS NO\nGOING BACK", "NO HAY VUELTA ATRAS"])
}

pub fn back_to_normal() -> LocalizedStr {
    LocalizedStr::new(["THE WORLD IS\nBACK TO NORMAL", "TODO VUELVE A\nLA NORMALIDAD"])
}
